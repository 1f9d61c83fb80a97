//! Functionality for running the capacity simulation.
use crate::capacity::CapacityEngine;
use crate::id::IDMap;
use crate::model::Model;
use crate::output::DataWriter;
use crate::profile::BundleID;
use crate::tariff::{Subscription, TariffSubscription};
use crate::time_slot::SimulationClock;
use crate::weather::WeatherReportRepo;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::rc::Rc;

/// A capacity engine along with the subscriptions it serves
struct BundleRunner {
    bundle_id: BundleID,
    engine: CapacityEngine,
    subscriptions: Vec<TariffSubscription>,
}

/// Create one runner per capacity bundle in the model.
///
/// Each engine gets its own random number generator, seeded from the model seed and the bundle's
/// position in the model.
fn create_runners(
    model: &Model,
    clock: &Rc<SimulationClock>,
    weather: &Rc<WeatherReportRepo>,
) -> Result<Vec<BundleRunner>> {
    let bundles = model.customers.iter().flat_map(|customer| {
        customer.bundles.iter().map(move |bundle| (customer, bundle))
    });

    let mut runners = Vec::new();
    for (offset, (customer, bundle)) in (0_u64..).zip(bundles) {
        let subscriptions = bundle
            .subscriptions
            .iter()
            .map(|subscription| {
                let (_, tariff) = model.tariffs.get_by_str(&subscription.tariff_id.0)?;
                Ok(TariffSubscription::new(
                    Rc::clone(tariff),
                    subscription.customers,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let engine = CapacityEngine::new(
            Rc::clone(&customer.profile),
            bundle.profile.clone(),
            clock.clone(),
            weather.clone(),
            model.parameters.seed.wrapping_add(offset),
        )?;

        runners.push(BundleRunner {
            bundle_id: bundle.id.clone(),
            engine,
            subscriptions,
        });
    }

    Ok(runners)
}

/// Run the simulation.
///
/// Every capacity bundle is stepped through each timeslot in turn, once for each of its
/// subscriptions. The resulting capacities are written to `capacities.csv` in the output folder.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
pub fn run(model: &Model, output_path: &Path) -> Result<()> {
    let params = &model.parameters;
    let clock = Rc::new(SimulationClock::new(params.start_time, params.timeslot_hours));
    let weather = Rc::new(WeatherReportRepo::new(
        model.weather_reports.clone(),
        Rc::clone(&clock),
    ));
    let mut runners = create_runners(model, &clock, &weather)?;
    info!(
        "Simulating {} capacity bundles for {} timeslots",
        runners.len(),
        params.timeslots
    );

    let mut writer = DataWriter::create(output_path)?;
    for serial_number in 1..=params.timeslots {
        let timeslot = clock.advance_to(serial_number).with_context(|| {
            format!("Start time of timeslot {serial_number} is out of the supported date range")
        })?;
        info!("Timeslot: {timeslot}");

        for runner in &mut runners {
            for subscription in &mut runner.subscriptions {
                let adjusted = runner
                    .engine
                    .use_capacity(&timeslot, subscription)
                    .with_context(|| {
                        format!(
                            "Failed to compute capacity for bundle {} in timeslot {serial_number}",
                            runner.bundle_id
                        )
                    })?;
                subscription.record_usage(adjusted);

                let base = runner.engine.history().base()[serial_number];
                writer.write_capacity(
                    &timeslot,
                    runner.engine.name(),
                    &runner.bundle_id,
                    subscription.tariff_id(),
                    base,
                    adjusted,
                )?;
            }
        }
    }
    writer.flush()?;

    for runner in &runners {
        for subscription in &runner.subscriptions {
            info!(
                "{}: Total usage of bundle {} on tariff {} = {}",
                runner.engine.name(),
                runner.bundle_id,
                subscription.tariff_id(),
                subscription.total_usage()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_profile, customer_profile, monday_afternoon, tariff};
    use crate::model::ModelParameters;
    use crate::profile::{
        BaseCapacity, BundleSubscription, CapacityBundle, CapacityProfile, Customer,
        CustomerProfile,
    };
    use crate::tariff::Tariff;
    use crate::timeseries::TimeSeriesSampler;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[fixture]
    fn model(
        customer_profile: CustomerProfile,
        capacity_profile: CapacityProfile,
        tariff: Tariff,
    ) -> Model {
        let bundle = CapacityBundle {
            id: "homes".into(),
            profile: capacity_profile,
            subscriptions: vec![
                BundleSubscription {
                    tariff_id: tariff.id.clone(),
                    customers: 500,
                },
                BundleSubscription {
                    tariff_id: tariff.id.clone(),
                    customers: 100,
                },
            ],
        };

        Model {
            model_path: PathBuf::from("model"),
            parameters: ModelParameters {
                start_time: monday_afternoon(),
                timeslots: 3,
                timeslot_hours: 1,
                seed: 7,
            },
            tariffs: indexmap! { tariff.id.clone() => Rc::new(tariff) },
            customers: vec![Customer {
                profile: Rc::new(customer_profile),
                bundles: vec![bundle],
            }],
            weather_reports: HashMap::new(),
        }
    }

    #[rstest]
    fn test_run(model: Model) {
        let dir = tempdir().unwrap();
        run(&model, dir.path()).unwrap();

        let contents = fs::read_to_string(dir.path().join("capacities.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "timeslot,start_time,customer,bundle,tariff,base_capacity,adjusted_capacity"
        );
        assert_eq!(lines[1], "1,2025-01-06 14:00,Village,homes,flat,100.0,50.0");
        assert_eq!(lines[2], "1,2025-01-06 14:00,Village,homes,flat,100.0,10.0");
        assert_eq!(lines[6], "3,2025-01-06 16:00,Village,homes,flat,100.0,10.0");
        assert_eq!(lines.len(), 7);
    }

    #[rstest]
    fn test_run_stops_on_failure(mut model: Model) {
        model.customers[0].bundles[0].profile.base_capacity =
            BaseCapacity::Timeseries(TimeSeriesSampler::new(vec![1.0, 2.0]));

        let dir = tempdir().unwrap();
        let err = run(&model, dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to compute capacity for bundle homes in timeslot 3"
        );
    }
}

use mixworks_core::ingredient::Speed;
use mixworks_core::settings::SessionSettings;
use mixworks_demo::script::{ScriptOptions, StaticWeather, run_script};
use mixworks_demo::DemoError;
use mixworks_core::weather::{GeoPoint, WeatherProvider};

fn options() -> ScriptOptions {
    ScriptOptions::default()
}

// -----------------------------------------------------------------------
// run_script
// -----------------------------------------------------------------------

#[test]
fn mild_weather_processes_every_pot() {
    let report = run_script(SessionSettings::default(), &options()).unwrap();
    assert_eq!(report.machines.len(), 3);
    assert_eq!(report.rejected_machines, 0);
    assert_eq!(report.pots.len(), 6);
    assert!(report.pots.iter().all(|p| p.processed));
    assert!(report.pots.iter().all(|p| p.triadic.is_some()));
    assert_eq!(report.grid_filled, 6);
    assert!(report.finished_at > 0);
}

#[test]
fn script_is_deterministic() {
    let a = run_script(SessionSettings::default(), &options()).unwrap();
    let b = run_script(SessionSettings::default(), &options()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn heat_leaves_one_machine_per_hall() {
    let hot = ScriptOptions {
        temperature_c: 39.0,
        ..options()
    };
    let report = run_script(SessionSettings::default(), &hot).unwrap();
    assert_eq!(report.rejected_machines, 2);
    assert_eq!(report.machines.len(), 1);
    assert!(report.machines[0].starts_with("Machine #1 (speed: easy)"));
    for pot in &report.pots {
        assert_eq!(pot.processed, pot.speed == Some(Speed::Easy));
    }
}

#[test]
fn rain_shows_in_status_lines() {
    let wet = ScriptOptions {
        temperature_c: 8.0,
        description: "light rain".to_string(),
        hall: 2,
        ..options()
    };
    let report = run_script(SessionSettings::default(), &wet).unwrap();
    assert!(report.machines.iter().all(|line| line.ends_with("| 8°C, light rain")));
    assert!(report.to_string().starts_with("=== Hall 2 | 8°C, light rain ==="));
}

#[test]
fn unknown_hall_is_an_error() {
    let bad = ScriptOptions {
        hall: 9,
        ..options()
    };
    assert!(matches!(
        run_script(SessionSettings::default(), &bad),
        Err(DemoError::UnknownHall(9))
    ));
}

#[test]
fn oversized_grid_is_an_error() {
    let huge = ScriptOptions {
        grid_size: usize::MAX,
        ..options()
    };
    assert!(matches!(
        run_script(SessionSettings::default(), &huge),
        Err(DemoError::Session(_))
    ));
}

#[test]
fn static_weather_answers_anywhere() {
    let weather = StaticWeather::new(-3.0, "snow");
    let report = weather.current_weather(GeoPoint::new(10.0, 20.0)).unwrap();
    assert_eq!(report.observation().temperature_c, -3.0);
}

// -----------------------------------------------------------------------
// bundled config
// -----------------------------------------------------------------------

fn config_dir() -> &'static std::path::Path {
    std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config"))
}

#[test]
fn bundled_config_runs_in_every_hall() {
    let settings = mixworks_data::load_session_config(config_dir()).unwrap();
    assert_eq!(settings.halls.len(), 3);
    assert_eq!(settings.rng_seed, 42);
    for hall in 1..=3 {
        let report = run_script(
            settings.clone(),
            &ScriptOptions {
                hall,
                ..options()
            },
        )
        .unwrap();
        assert_eq!(report.pots.len(), 6);
    }
}

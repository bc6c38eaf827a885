#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixworks_core::id::{HallId, MachineId, PotId};
use mixworks_core::ingredient::Speed;
use mixworks_core::test_utils::*;
use mixworks_core::weather::WeatherObservation;

/// A structured user action for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Pot { speed: u8, colors: u8 },
    Machine { speed: u8, temperature: i8 },
    Assign { pot: u8, machine: u8 },
    Drop { ingredient: u8, pot: u8 },
    Start { machine: u8 },
    Single { machine: u8, pot: u8 },
    Advance { ms: u16 },
    Hall { id: u8 },
    Weather { temperature: i8, rain: bool },
}

/// Top-level fuzz input: a sequence of actions.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn speed(v: u8) -> Speed {
    Speed::ALL[usize::from(v) % Speed::ALL.len()]
}

fuzz_target!(|input: FuzzInput| {
    let mut s = session();

    // Limit operations to prevent timeouts.
    for op in input.ops.into_iter().take(256) {
        match op {
            FuzzOp::Pot { speed: v, colors } => {
                let palette = ["red", "#00ff00", "rgb(1,2,3)", "nonsense"];
                let picked: Vec<&str> = (0..colors % 5)
                    .map(|i| palette[usize::from(i) % palette.len()])
                    .collect();
                filled_pot(&mut s, speed(v), &picked);
            }
            FuzzOp::Machine { speed: v, temperature } => {
                let weather = WeatherObservation::new(f64::from(temperature), "clear sky");
                let _ = s.create_machine(speed(v), Some(&weather));
            }
            FuzzOp::Assign { pot, machine } => {
                let _ = s.assign_pot_id(PotId(u32::from(pot)), MachineId(u32::from(machine)));
            }
            FuzzOp::Drop { ingredient, pot } => {
                let _ = s.drop_ingredient(&format!("ingredient-{ingredient}"), &format!("pot-{pot}"));
            }
            FuzzOp::Start { machine } => {
                let _ = s.start_machine(MachineId(u32::from(machine)));
            }
            FuzzOp::Single { machine, pot } => {
                let _ = s.process_single_pot(MachineId(u32::from(machine)), PotId(u32::from(pot)));
            }
            FuzzOp::Advance { ms } => {
                s.advance(u64::from(ms));
            }
            FuzzOp::Hall { id } => s.switch_hall(HallId(u32::from(id % 4))),
            FuzzOp::Weather { temperature, rain } => {
                let description = if rain { "moderate rain" } else { "few clouds" };
                s.apply_weather(&WeatherObservation::new(f64::from(temperature), description));
            }
        }
        assert!(s.store().check_consistency().is_empty());
    }
    s.run_until_idle();
    assert!(s.store().machines().all(|m| !m.is_busy()));
});

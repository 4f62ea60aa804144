use super::component::{Component, DeployEvent, Deployment, FinSet, TransitionShape};
use super::motor::{Motor, MotorLibrary, MotorMount};
use super::rocket::{Rocket, RocketBuilder};
use super::stage::{SeparationEvent, StageBuilder};

// ---------------------------------------------------------------------------
// Preset rockets and motors
// ---------------------------------------------------------------------------

pub const SKY_C: &str = "Sky-C";

/// 18 mm C-class motor with a 2.0 s burn.
pub fn sky_c() -> Motor {
    Motor {
        designation: SKY_C.into(),
        diameter: 0.018,
        length: 0.07,
        total_mass: 0.024,
        propellant_mass: 0.011,
        thrust_curve: vec![
            (0.0, 0.0),
            (0.05, 6.0),
            (0.15, 14.0),
            (0.25, 10.0),
            (0.4, 4.5),
            (1.9, 3.8),
            (2.0, 0.0),
        ],
    }
}

pub fn motors() -> MotorLibrary {
    MotorLibrary::new().with(SKY_C, sky_c())
}

const BODY_RADIUS: f64 = 0.0124; // m
const BODY_INNER: f64 = 0.0120;  // m

fn nose_cone() -> Component {
    Component::nose_cone("Nose cone", TransitionShape::Ogive, 0.07, BODY_RADIUS).with_mass(0.006)
}

fn sustainer_tube(length: f64, ejection_delay: f64) -> Component {
    let fins = FinSet::trapezoidal(3, 0.05, 0.025, 0.025, 0.045, 0.0024);
    Component::body_tube("Body tube", length, BODY_RADIUS, BODY_INNER)
        .with_mass(0.012)
        .with_motor_mount(MotorMount::new(SKY_C).ejection_delay(Some(ejection_delay)))
        .with_child(
            Component::parachute("Parachute", 0.3, 0.8, Deployment::default())
                .at(0.02)
                .with_mass(0.01),
        )
        .with_child(
            Component::launch_lug("Launch lug", 0.03, 0.0025, 0.0022)
                .at(0.1)
                .with_mass(0.001),
        )
        .with_child(Component::fin_set("Fins", fins).at(length - 0.05).with_mass(0.008))
}

/// Single-stage sport rocket; the ejection charge fires at burnout.
pub fn sparrow() -> Rocket {
    RocketBuilder::new("Sparrow")
        .stage(
            StageBuilder::new("Sustainer")
                .component(nose_cone())
                .component(sustainer_tube(0.254, 0.0))
                .build(),
        )
        .build()
}

/// Two-stage variant: the booster's ejection charge lights the sustainer,
/// which separates the booster.
pub fn sparrow_duo() -> Rocket {
    let booster_fins = FinSet::trapezoidal(3, 0.06, 0.03, 0.03, 0.05, 0.0024);
    RocketBuilder::new("Sparrow Duo")
        .stage(
            StageBuilder::new("Sustainer")
                .component(nose_cone())
                .component(sustainer_tube(0.254, 4.0))
                .build(),
        )
        .stage(
            StageBuilder::new("Booster")
                .component(
                    Component::body_tube("Booster tube", 0.12, BODY_RADIUS, BODY_INNER)
                        .with_mass(0.008)
                        .with_motor_mount(MotorMount::new(SKY_C).ejection_delay(Some(0.0)))
                        .with_child(
                            Component::fin_set("Booster fins", booster_fins)
                                .at(0.06)
                                .with_mass(0.009),
                        ),
                )
                .separation(SeparationEvent::UpperIgnition, 0.0)
                .build(),
        )
        .build()
}

/// Deployment at apogee rather than at the ejection charge.
pub fn apogee_deployment() -> Deployment {
    Deployment { event: DeployEvent::Apogee, delay: 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_expected_stages() {
        assert_eq!(sparrow().stage_count(), 1);
        assert_eq!(sparrow_duo().stage_count(), 2);
        assert!((sky_c().burn_time() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sky_c_is_a_c_class_motor() {
        let impulse = sky_c().total_impulse();
        assert!(impulse > 5.0 && impulse <= 10.0, "impulse {}", impulse);
    }
}

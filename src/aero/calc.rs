use std::f64::consts::PI;

use nalgebra::Isometry3;

use super::conditions::FlightConditions;
use super::fins::{self, FinGeometry};
use super::forces::AerodynamicForces;
use super::symmetric::{self, SymmetricGeometry};
use super::tube::{interior_pressure_cd, TubeFlow};
use super::tube_fins::{self, TubeFinGeometry};
use crate::error::Result;
use crate::vehicle::{ComponentKind, PlacedComponent, RocketLayout};
use crate::warning::WarningSet;

// ---------------------------------------------------------------------------
// Per-component aerodynamic calculator
// ---------------------------------------------------------------------------

/// Aerodynamic model of one component, with its geometry derived once.
#[derive(Debug, Clone)]
pub enum ComponentCalc {
    FinSet(FinGeometry),
    TubeFinSet(TubeFinGeometry),
    BodyTube(SymmetricGeometry),
    LaunchLug(TubeFlow),
    Transition(SymmetricGeometry),
    /// Containers carry no aerodynamics of their own.
    Assembly,
}

impl ComponentCalc {
    /// Build the calculator for a placed component, or `None` for parts
    /// inside the airframe (parachutes, mass objects).
    pub fn new(
        layout: &RocketLayout,
        component: &PlacedComponent,
    ) -> Result<Option<ComponentCalc>> {
        let calc = match &component.kind {
            ComponentKind::FinSet(spec) => {
                let count = fins::interference_count(layout, component.id)?;
                let geometry =
                    fins::derive_geometry(&component.name, spec, component.body_radius, count);
                ComponentCalc::FinSet(geometry)
            }
            ComponentKind::TubeFinSet(spec) => ComponentCalc::TubeFinSet(tube_fins::derive_geometry(
                &component.name,
                spec,
                component.body_radius,
                layout.roughness,
            )),
            ComponentKind::BodyTube(tube) => ComponentCalc::BodyTube(symmetric::derive_body_tube(
                &component.name,
                tube.length,
                tube.outer_radius,
                tube.inner_radius,
                component.open_forward,
                layout.roughness,
            )),
            ComponentKind::Transition(t) => {
                ComponentCalc::Transition(symmetric::derive_transition(&component.name, t))
            }
            ComponentKind::LaunchLug(lug) => ComponentCalc::LaunchLug(TubeFlow {
                length: lug.length,
                inner_radius: lug.inner_radius,
                outer_radius: lug.outer_radius,
                roughness: layout.roughness,
            }),
            ComponentKind::Assembly => ComponentCalc::Assembly,
            ComponentKind::Parachute(_) | ComponentKind::MassObject { .. } => return Ok(None),
        };
        Ok(Some(calc))
    }

    /// Whether the component is part of the axisymmetric body.
    pub fn body(&self) -> Option<&SymmetricGeometry> {
        match self {
            ComponentCalc::BodyTube(g) | ComponentCalc::Transition(g) => Some(g),
            _ => None,
        }
    }

    /// Roll angles of the identical instances (single fins or tubes).
    pub fn instance_angles(&self, component: &PlacedComponent) -> Vec<f64> {
        let (count, base) = match (&component.kind, self) {
            (ComponentKind::FinSet(spec), ComponentCalc::FinSet(_)) => {
                (spec.fin_count, spec.base_rotation)
            }
            (ComponentKind::TubeFinSet(spec), ComponentCalc::TubeFinSet(_)) => {
                (spec.fin_count, spec.base_rotation)
            }
            _ => (1, 0.0),
        };
        (0..count).map(|i| base + 2.0 * PI * i as f64 / count as f64).collect()
    }

    /// Normal force, pitch moment, roll and CP of one instance, in the
    /// component's own frame.
    pub fn nonaxial_forces(
        &self,
        conditions: &FlightConditions,
        transform: &Isometry3<f64>,
        warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        match self {
            ComponentCalc::FinSet(g) => g.nonaxial_forces(conditions, transform, warnings),
            ComponentCalc::TubeFinSet(g) => g.nonaxial_forces(conditions, transform, warnings),
            ComponentCalc::BodyTube(g) | ComponentCalc::Transition(g) => {
                g.nonaxial_forces(conditions, transform, warnings)
            }
            ComponentCalc::LaunchLug(_) | ComponentCalc::Assembly => AerodynamicForces::zero(),
        }
    }

    pub fn friction_drag_coefficient(
        &self,
        conditions: &FlightConditions,
        component_cf: f64,
        _warnings: &mut WarningSet,
    ) -> f64 {
        match self {
            ComponentCalc::FinSet(g) => g.friction_cd(conditions, component_cf),
            ComponentCalc::TubeFinSet(g) => g.friction_cd(conditions, component_cf),
            ComponentCalc::BodyTube(g) | ComponentCalc::Transition(g) => {
                g.friction_cd(conditions, component_cf)
            }
            ComponentCalc::LaunchLug(lug) => {
                let wetted = 2.0 * PI * (lug.outer_radius + lug.inner_radius) * lug.length;
                component_cf * wetted / conditions.ref_area
            }
            ComponentCalc::Assembly => 0.0,
        }
    }

    pub fn pressure_drag_coefficient(
        &self,
        conditions: &FlightConditions,
        stagnation_cd: f64,
        base_cd: f64,
        warnings: &mut WarningSet,
    ) -> f64 {
        match self {
            ComponentCalc::FinSet(g) => g.pressure_cd(conditions, stagnation_cd, base_cd),
            ComponentCalc::TubeFinSet(g) => {
                g.pressure_cd(conditions, stagnation_cd, base_cd, warnings)
            }
            ComponentCalc::BodyTube(g) | ComponentCalc::Transition(g) => {
                g.pressure_cd(conditions, stagnation_cd, base_cd, warnings)
            }
            ComponentCalc::LaunchLug(lug) => {
                interior_pressure_cd(lug, conditions, stagnation_cd, base_cd)
            }
            ComponentCalc::Assembly => 0.0,
        }
    }
}

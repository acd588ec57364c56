//! Enemy states
//!
//! Roaming states (Idle, Patrol, Investigate) poll for a target every frame.
//! Engaged states (Chase, Attack, RangedAttack) work off the current target.
//! Flee and Death are entered by the controller in response to damage.

mod engage;
mod retreat;
mod roam;

pub use engage::{AttackState, ChaseState, RangedAttackState};
pub use retreat::{DeathState, FleeState};
pub use roam::{IdleState, InvestigateState, PatrolState};

use crate::core::{StateResult, Transition};

use super::controller::EnemyStateKind;

type Kind = EnemyStateKind;

fn stay() -> StateResult<Transition<Kind>> {
    Ok(Transition::None)
}

fn go(kind: Kind) -> StateResult<Transition<Kind>> {
    Ok(Transition::To(kind))
}

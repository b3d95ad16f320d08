use crate::{Result, SchedulerError};
use rand::seq::SliceRandom;
use rand::Rng;

/// Pick one node uniformly at random from the eligible set.
///
/// An empty set yields `NoEligibleNode` instead of a pick.
pub fn select_node<R: Rng + ?Sized>(
    pod_name: &str,
    eligible: &[String],
    rng: &mut R,
) -> Result<String> {
    eligible.choose(rng).cloned().ok_or_else(|| {
        SchedulerError::no_eligible_node(pod_name, "no node matches the pod's placement labels")
    })
}

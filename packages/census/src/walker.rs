//! Resumable iteration over states.
//!
//! A long fetch run can be interrupted at any point. Nothing is persisted
//! about progress; instead the operator passes the last state that
//! finished as the checkpoint and the walk resumes with the state after it.

/// Returns the distinct states that sort strictly after `checkpoint`,
/// ascending.
///
/// `None` yields every state. Ordering and the checkpoint comparison use
/// the trimmed, upper-cased postal code, but the returned codes are the
/// store's own spelling so they can be passed straight back to it.
#[must_use]
pub fn states_after(states: &[String], checkpoint: Option<&str>) -> Vec<String> {
    let checkpoint = checkpoint.map(normalize);

    let mut ordered: Vec<&String> = states.iter().collect();
    ordered.sort_by_cached_key(|state| normalize(state));
    ordered.dedup_by(|a, b| a.trim().eq_ignore_ascii_case(b.trim()));

    ordered
        .into_iter()
        .filter(|state| match &checkpoint {
            Some(checkpoint) if normalize(state) <= *checkpoint => {
                log::info!("skipping {state}");
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

fn normalize(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

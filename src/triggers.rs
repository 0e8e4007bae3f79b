/// Expiry trigger hand-off
///
/// Tokens may carry a list of action identifiers to run once they expire.
/// Nothing here executes those actions: when an expired, correctly signed
/// token is presented, its trigger is handed to a dispatcher supplied by the
/// host application.

pub trait TriggerDispatcher: Send + Sync {
    fn dispatch(&self, subject_id: i64, actions: &[String]);
}

/// Dispatcher that records trigger requests as structured events
#[derive(Debug, Default)]
pub struct TracingTriggerDispatcher;

impl TriggerDispatcher for TracingTriggerDispatcher {
    fn dispatch(&self, subject_id: i64, actions: &[String]) {
        tracing::info!(
            subject_id,
            actions = ?actions,
            "Expiry trigger requested"
        );
    }
}

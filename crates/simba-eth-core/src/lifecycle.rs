use crate::workflow::ActionState;
use crate::CoreError;

pub fn validate_transition(from: ActionState, to: ActionState) -> Result<(), CoreError> {
    let valid = from == to
        || match (from, to) {
            (_, ActionState::Inited) => false,
            (ActionState::Completed, ActionState::FailedSetProxy) => true,
            (ActionState::Completed, _) => false,
            _ => true,
        };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

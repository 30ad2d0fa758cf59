use crate::types::ChangeResult;

/// Change result for the target drawn at position `j` out of `n`
///
/// The first half of a draw changes, the second half stays constant. With
/// `loss_enabled` the first quarter loses its second sense instead of gaining it.
pub fn select_result(j: usize, n: usize, loss_enabled: bool) -> ChangeResult {
    // j < n/2 and j < n/4 without integer division truncation
    if 2 * j < n {
        if loss_enabled && 4 * j < n {
            ChangeResult::Loss
        } else {
            ChangeResult::Gain
        }
    } else {
        ChangeResult::Constant
    }
}

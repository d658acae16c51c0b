//! Selection over a pool's eligible members.

use rand::seq::SliceRandom;

use profilehub_entity::pool::SelectionMode;
use profilehub_entity::profile::Profile;

/// Pick one profile from `eligible` according to `mode`.
///
/// Sequential mode reads `cursor` modulo the eligible count and leaves it
/// pointing at the following member. `Weighted` has no weight source and
/// draws uniformly like `Random`. Returns `None` only for an empty slice.
pub fn pick(mode: SelectionMode, eligible: &[Profile], cursor: &mut u32) -> Option<Profile> {
    if eligible.is_empty() {
        return None;
    }

    match mode {
        SelectionMode::Sequential => {
            let len = eligible.len();
            let index = *cursor as usize % len;
            *cursor = ((index + 1) % len) as u32;
            Some(eligible[index])
        }
        SelectionMode::Random | SelectionMode::Weighted => {
            eligible.choose(&mut rand::thread_rng()).copied()
        }
    }
}

//! Repositioning for sequence-backed collections.
use tracing::debug;

use crate::{
    collection::{Backing, Collection, Member},
    error::AppError,
    store::{MoveOutcome, MoveTarget},
};

impl<T: Member> Collection<T> {
    /// Moves `id` immediately before `target`'s anchor, or to the head. Never changes the count.
    pub async fn move_member(&self, id: &str, target: &MoveTarget) -> Result<(), AppError> {
        if self.backing != Backing::Sequence {
            return Err(AppError::validation("not_orderable"));
        }

        match self.store.sequence_move(&self.key, id, target).await? {
            MoveOutcome::Moved => {
                debug!("Moved {id} in {} to {target:?}", self.key);
                Ok(())
            }
            MoveOutcome::MissingElement => Err(AppError::not_found(id)),
            MoveOutcome::MissingAnchor => match target {
                MoveTarget::Before(anchor) => Err(AppError::not_found(anchor)),
                MoveTarget::Head => Err(AppError::not_found(id)),
            },
        }
    }
}

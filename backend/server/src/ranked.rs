//! Vote ranking for scored collections.
//!
//! Scores sort ascending, so more votes must mean a lower score. Within one tally the member that
//! reached it first (lower tick) stays ahead:
//!
//! `score = -(votes * 2^32) + arrival`
//!
//! Exact in an `f64` while `votes < 2^21` and `arrival < 2^32`.
use tracing::debug;

use crate::{
    collection::{Backing, Collection, Member},
    error::AppError,
};

const ARRIVAL_SPAN: f64 = 4_294_967_296.0;

pub fn rank_score(votes: u64, arrival: i64) -> f64 {
    -(votes as f64) * ARRIVAL_SPAN + arrival as f64
}

impl<T: Member> Collection<T> {
    /// Rescores `id` in place, which repositions it. Never changes the count.
    pub async fn rank(&self, id: &str, votes: u64, arrival: i64) -> Result<(), AppError> {
        if self.backing != Backing::Scored {
            return Err(AppError::validation("not_ranked"));
        }
        if self.store.scored_set_score(&self.key, id).await?.is_none() {
            return Err(AppError::not_found(id));
        }

        let score = rank_score(votes, arrival);
        self.store.scored_set_add(&self.key, id, score).await?;
        debug!("Ranked {id} in {} at {score} ({votes} votes)", self.key);
        Ok(())
    }
}

use crate::segment::Segment;
use anyhow::Result;
use async_trait::async_trait;

/// Plays segments to the candidate.
///
/// `play` renders the segment's entries one after the other and resolves once,
/// after the last entry has finished.
#[async_trait]
pub trait AvatarRenderer: Send + Sync {
    async fn play(&self, segment: &Segment) -> Result<()>;
}

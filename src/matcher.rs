//! # Matcher Module
//!
//! Indice delle thumbnail per chiave normalizzata e classificazione dei video.
//!
//! ## Algoritmo:
//! 1. Costruisce una multi-map `chiave -> thumbnail` che conserva le collisioni
//! 2. Per ogni video normalizza il filename e raccoglie le thumbnail con la stessa chiave
//! 3. Classifica: 1 candidato = `Matched`, 0 = `NoMatch`, >1 = `Ambiguous`
//!
//! Le collisioni non vengono deduplicate: due thumbnail con la stessa chiave
//! rendono ambigua la chiave per ogni video che la condivide.
//! Nessuna mutazione avviene qui, quindi è sicuro chiamarlo anche in dry run.

use crate::model::{Asset, MatchOutcome};
use crate::normalizer::normalize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Thumbnails grouped by normalized key
#[derive(Debug, Default)]
pub struct ThumbnailIndex<'a> {
    by_key: HashMap<String, Vec<&'a Asset>>,
}

impl<'a> ThumbnailIndex<'a> {
    pub fn build(thumbnails: &'a [Asset]) -> Self {
        let mut by_key: HashMap<String, Vec<&'a Asset>> = HashMap::new();
        for thumb in thumbnails {
            let key = normalize(&thumb.filename);
            debug!("Indexed thumbnail: original=\"{}\" normalized=\"{}\"", thumb.filename, key);
            by_key.entry(key).or_default().push(thumb);
        }
        Self { by_key }
    }

    /// Thumbnails whose key equals `key`, in input order
    pub fn candidates(&self, key: &str) -> &[&'a Asset] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys shared by more than one thumbnail
    pub fn colliding_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .by_key
            .iter()
            .filter(|(_, thumbs)| thumbs.len() > 1)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn classify(&self, video: &Asset) -> MatchOutcome {
        let key = normalize(&video.filename);
        let found = self.candidates(&key);

        match found {
            [] => {
                info!("NO MATCH: video=\"{}\"", video.filename);
                MatchOutcome::NoMatch { video: video.clone() }
            }
            [single] => {
                info!("MATCH: video=\"{}\" -> thumbnail=\"{}\"", video.filename, single.filename);
                MatchOutcome::Matched {
                    video: video.clone(),
                    thumbnail: (*single).clone(),
                }
            }
            many => {
                let candidates: Vec<String> = many.iter().map(|t| t.filename.clone()).collect();
                warn!(
                    "MULTIPLE MATCHES: video=\"{}\" thumbnails={}",
                    video.filename,
                    candidates.join(", ")
                );
                MatchOutcome::Ambiguous {
                    video: video.clone(),
                    candidates,
                }
            }
        }
    }
}

/// Classify every video against the thumbnails, one outcome per video in input order
pub fn match_assets(videos: &[Asset], thumbnails: &[Asset]) -> Vec<MatchOutcome> {
    let index = ThumbnailIndex::build(thumbnails);
    let collisions = index.colliding_keys();
    if !collisions.is_empty() {
        debug!("Thumbnail keys with collisions: {}", collisions.join(", "));
    }
    videos.iter().map(|video| index.classify(video)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetKind;

    fn videos(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Asset::new(i as u64 + 1, *n, "videos", AssetKind::Video))
            .collect()
    }

    fn thumbs(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Asset::new(i as u64 + 100, *n, "thumbnailsInbox", AssetKind::Thumbnail))
            .collect()
    }

    #[test]
    fn test_single_match() {
        let outcomes = match_assets(&videos(&["Clip_01.mov"]), &thumbs(&["clip-01.jpg"]));
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            MatchOutcome::Matched { video, thumbnail } => {
                assert_eq!(video.filename, "Clip_01.mov");
                assert_eq!(thumbnail.filename, "clip-01.jpg");
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_key_only() {
        let outcomes = match_assets(&videos(&["foo.mp4"]), &thumbs(&["foo-bar.jpg", "xfoo.jpg"]));
        assert!(matches!(outcomes[0], MatchOutcome::NoMatch { .. }));
    }

    #[test]
    fn test_collision_is_ambiguous() {
        let outcomes = match_assets(&videos(&["Trip.mp4"]), &thumbs(&["trip.jpg", "TRIP.PNG"]));
        assert_eq!(
            outcomes[0],
            MatchOutcome::Ambiguous {
                video: videos(&["Trip.mp4"]).remove(0),
                candidates: vec!["trip.jpg".to_string(), "TRIP.PNG".to_string()],
            }
        );
    }

    #[test]
    fn test_outcomes_partition_videos_in_order() {
        let vids = videos(&["b.mp4", "a.mp4", "c.mp4", "a.mov"]);
        let outcomes = match_assets(&vids, &thumbs(&["a.jpg", "c.jpg", "c.png"]));

        let order: Vec<&str> = outcomes.iter().map(|o| o.video().filename.as_str()).collect();
        assert_eq!(order, vec!["b.mp4", "a.mp4", "c.mp4", "a.mov"]);
        assert!(matches!(outcomes[0], MatchOutcome::NoMatch { .. }));
        assert!(matches!(outcomes[1], MatchOutcome::Matched { .. }));
        assert!(matches!(outcomes[2], MatchOutcome::Ambiguous { .. }));
        // the same thumbnail may match several videos sharing its key
        assert!(matches!(outcomes[3], MatchOutcome::Matched { .. }));
    }

    #[test]
    fn test_colliding_keys() {
        let list = thumbs(&["x.jpg", "X.png", "y.jpg"]);
        let index = ThumbnailIndex::build(&list);
        assert_eq!(index.colliding_keys(), vec!["x"]);
        assert_eq!(index.candidates("y").len(), 1);
        assert!(index.candidates("z").is_empty());
    }
}

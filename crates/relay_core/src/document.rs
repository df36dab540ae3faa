use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    pub src: String,
}

/// The image elements of one hosted document. Clones share the same elements.
#[derive(Debug, Clone)]
pub struct Document {
    images: Arc<Mutex<Vec<ImageElement>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            images: Arc::default(),
            revision: Arc::new(watch::channel(0).0),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document = Self::new();
        for src in sources {
            document.add_image(src);
        }
        document
    }

    pub fn add_image(&self, src: impl Into<String>) {
        self.images.lock().push(ImageElement { src: src.into() });
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub fn sources(&self) -> Vec<String> {
        self.images
            .lock()
            .iter()
            .map(|image| image.src.clone())
            .collect()
    }

    /// Points every image whose source equals `old` at `new`. Returns how many
    /// elements changed.
    pub fn replace_source(&self, old: &str, new: &str) -> usize {
        let replaced = {
            let mut images = self.images.lock();
            let mut replaced = 0;
            for image in images.iter_mut().filter(|image| image.src == old) {
                image.src = new.to_string();
                replaced += 1;
            }
            replaced
        };
        if replaced > 0 {
            self.revision.send_modify(|revision| *revision += 1);
        }
        replaced
    }

    /// Ticks whenever an element is added or changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_matching_image() {
        let document = Document::with_images([
            "http://x/img.png",
            "http://x/other.png",
            "http://x/img.png",
        ]);

        assert_eq!(document.replace_source("http://x/img.png", "data:new"), 2);
        assert_eq!(
            document.sources(),
            vec!["data:new", "http://x/other.png", "data:new"]
        );
    }

    #[test]
    fn unmatched_source_changes_nothing() {
        let document = Document::with_images(["http://x/img.png"]);
        let revisions = document.subscribe();
        let before = *revisions.borrow();

        assert_eq!(document.replace_source("http://x/missing.png", "data:new"), 0);
        assert_eq!(*revisions.borrow(), before);
    }

    #[tokio::test]
    async fn subscribers_see_replacements() {
        let document = Document::with_images(["http://x/img.png"]);
        let mut revisions = document.subscribe();
        revisions.borrow_and_update();

        document.replace_source("http://x/img.png", "data:new");
        revisions.changed().await.expect("revision");
        assert_eq!(document.sources(), vec!["data:new"]);
    }
}

use crate::identity::domain::face_identifier::FaceIdentifier;
use crate::identity::domain::identity_key::IdentityKey;
use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

/// Binds a detection to the key its smoothing history lives under.
///
/// Every failure to identify (identification disabled, no match, backend
/// error) falls back to an ephemeral key unique to the detection, so two
/// anonymous people never share a history.
pub struct IdentityResolver {
    identifier: Option<Box<dyn FaceIdentifier>>,
}

impl IdentityResolver {
    pub fn new(identifier: Box<dyn FaceIdentifier>) -> Self {
        Self {
            identifier: Some(identifier),
        }
    }

    /// Resolver that never calls an identifier.
    pub fn disabled() -> Self {
        Self { identifier: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.identifier.is_some()
    }

    pub fn resolve(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
        frame_index: usize,
        detection_index: usize,
    ) -> IdentityKey {
        let fallback = || IdentityKey::ephemeral(frame_index, detection_index);
        let Some(identifier) = &mut self.identifier else {
            return fallback();
        };

        match identifier.identify(frame, bbox) {
            Ok(Some(name)) => IdentityKey::resolved(name).unwrap_or_else(fallback),
            Ok(None) => fallback(),
            Err(e) => {
                log::warn!(
                    "Face identification failed for frame {frame_index} detection {detection_index}: {e}"
                );
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // --- Stubs ---

    struct FixedIdentifier {
        answer: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedIdentifier {
        fn boxed(answer: Option<&str>) -> (Box<dyn FaceIdentifier>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let identifier = Self {
                answer: answer.map(str::to_string),
                calls: Arc::clone(&calls),
            };
            (Box::new(identifier), calls)
        }
    }

    impl FaceIdentifier for FixedIdentifier {
        fn identify(
            &mut self,
            _frame: &Frame,
            _bbox: &BoundingBox,
        ) -> Result<Option<String>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    struct FailingIdentifier;

    impl FaceIdentifier for FailingIdentifier {
        fn identify(
            &mut self,
            _frame: &Frame,
            _bbox: &BoundingBox,
        ) -> Result<Option<String>, Box<dyn std::error::Error>> {
            Err("recognizer not loaded".into())
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 300], 10, 10, 3, 0)
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(0, 0, 10, 10)
    }

    // --- Tests ---

    #[test]
    fn test_disabled_returns_ephemeral_key() {
        let mut resolver = IdentityResolver::disabled();
        let key = resolver.resolve(&frame(), &bbox(), 7, 2);
        assert_eq!(key.to_string(), "Unknown_7_2");
        assert!(!resolver.is_enabled());
    }

    #[test]
    fn test_match_returns_resolved_key() {
        let (identifier, calls) = FixedIdentifier::boxed(Some("alice"));
        let mut resolver = IdentityResolver::new(identifier);
        let key = resolver.resolve(&frame(), &bbox(), 1, 0);
        assert_eq!(key, IdentityKey::Resolved("alice".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_match_falls_back_to_ephemeral() {
        let (identifier, _) = FixedIdentifier::boxed(None);
        let mut resolver = IdentityResolver::new(identifier);
        assert_eq!(
            resolver.resolve(&frame(), &bbox(), 4, 1),
            IdentityKey::ephemeral(4, 1)
        );
    }

    #[test]
    fn test_sentinel_name_falls_back_to_ephemeral() {
        let (identifier, _) = FixedIdentifier::boxed(Some("Unknown"));
        let mut resolver = IdentityResolver::new(identifier);
        assert_eq!(
            resolver.resolve(&frame(), &bbox(), 4, 1),
            IdentityKey::ephemeral(4, 1)
        );
    }

    #[test]
    fn test_identifier_error_is_recovered() {
        let mut resolver = IdentityResolver::new(Box::new(FailingIdentifier));
        assert_eq!(
            resolver.resolve(&frame(), &bbox(), 9, 3),
            IdentityKey::ephemeral(9, 3)
        );
    }

    #[test]
    fn test_unidentified_detections_in_one_frame_get_distinct_keys() {
        let mut resolver = IdentityResolver::new(Box::new(FailingIdentifier));
        let a = resolver.resolve(&frame(), &bbox(), 5, 0);
        let b = resolver.resolve(&frame(), &bbox(), 5, 1);
        assert_ne!(a, b);
    }
}

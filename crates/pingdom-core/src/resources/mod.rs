//! Built-in resource kinds
//!
//! One [`Resource`] per kind, each with its static descriptor:
//!
//! | Kind          | Client    | Collection     |
//! |---------------|-----------|----------------|
//! | `check`       | primary   | checks         |
//! | `team`        | primary   | alerting teams |
//! | `contact`     | primary   | alerting contacts |
//! | `integration` | secondary | integrations   |
//! | `maintenance` | primary   | maintenance    |
//! | `occurrence`  | primary   | maintenance occurrences |
//! | `tms_check`   | primary   | transaction checks |

use std::sync::Arc;

use crate::schema::ResourceDescriptor;
use crate::traits::Resource;

pub mod check;
pub mod contact;
pub mod integration;
pub mod maintenance;
pub mod occurrence;
pub mod team;
pub mod tms_check;
pub(crate) mod wire;

pub use check::Check;
pub use contact::Contact;
pub use integration::Integration;
pub use maintenance::Maintenance;
pub use occurrence::Occurrence;
pub use team::Team;
pub use tms_check::TmsCheck;

/// Descriptors of every built-in resource kind
pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        check::descriptor(),
        team::descriptor(),
        contact::descriptor(),
        integration::descriptor(),
        maintenance::descriptor(),
        occurrence::descriptor(),
        tms_check::descriptor(),
    ]
}

/// Reconcilers of every built-in resource kind
pub fn builtin() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(Check),
        Arc::new(Team),
        Arc::new(Contact),
        Arc::new(Integration),
        Arc::new(Maintenance),
        Arc::new(Occurrence),
        Arc::new(TmsCheck),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reconciler_has_a_descriptor() {
        let kinds: Vec<_> = descriptors().iter().map(|d| d.kind()).collect();
        for resource in builtin() {
            assert!(kinds.contains(&resource.kind()), "{}", resource.kind());
        }
        assert_eq!(kinds.len(), builtin().len());
    }
}

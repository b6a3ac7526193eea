//! Stream/buffer allocation and validation for Data Fabric Gasket networks.
//!
//! Streams route data between fixed-capacity gaskets. After every edit the
//! whole model is recomputed: logical indices are reassigned, buffers are
//! packed largest-first, physical channel ids are resolved, and the result is
//! checked against each gasket's capacity and legal buffer sizes.

pub mod action;
pub mod catalog;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod gasket;
#[doc(hidden)]
pub mod harness;
pub mod index;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod model;
pub mod persist;
pub mod plan;
pub mod stream;
pub mod validate;

pub use action::ModelAction;
pub use catalog::{Catalog, GasketBufferSizeProps};
pub use dsl::{DraftError, StreamDraft};
pub use error::{LoadError, ModelError};
pub use gasket::{Channel, Direction, Gasket, GasketId, GasketTable};
pub use model::{recompute_streams, DfgModel, Recomputed};
pub use stream::{DfgStream, Endpoint, StreamId, StreamPatch};
pub use validate::{ErrorReport, GasketError, GasketErrorKind, GasketUsage, StreamError, StreamErrorKind};

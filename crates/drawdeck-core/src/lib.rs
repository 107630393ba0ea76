//! Drawdeck Core Library
//!
//! Element repository and scene serialization engine for
//! Excalidraw-compatible documents: the in-memory element model,
//! normalization/defaulting rules, query and organization operations, and
//! the deterministic translator to the `.excalidraw` document format.

pub mod element;
pub mod error;
pub mod export;
pub mod ident;
pub mod normalize;
pub mod ops;
pub mod organize;
pub mod query;
pub mod repository;
pub mod scene;
pub mod workspace;

pub use element::{Element, ElementType};
pub use error::{CoreError, CoreResult};
pub use export::{DocumentSink, FileSink, MemorySink, SCENE_EXTENSION};
pub use ident::{IdentitySource, SequentialIdentity, SystemIdentity};
pub use normalize::CreateInput;
pub use organize::{Alignment, Direction};
pub use repository::ElementRepository;
pub use scene::{SceneState, Theme, Viewport};
pub use workspace::Workspace;

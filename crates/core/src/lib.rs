//! Frame generation strategy engine.
//!
//! Decides, for every frame of a storyboard scene, whether it is rendered
//! by its own generation call or batched with other frames into a shared
//! composite grid, without breaking character consistency:
//!
//! - [`rules`]: the ordered consistency rules and scale-conflict checks.
//! - [`classifier`]: provisional per-frame strategies.
//! - [`grouper`]: grid packing and the sequence-continuity closure.
//! - [`validator`]: the final check every returned plan passes.
//! - [`StrategyEngine`]: runs the above for one scene.
//!
//! The engine performs no I/O and holds no state between scenes.

pub mod classifier;
pub mod config;
pub mod dialogue;
pub mod engine;
pub mod error;
pub mod frame;
pub mod grid;
pub mod grouper;
pub mod plan;
pub mod rules;
pub mod scale;
pub mod sequence;
pub mod stats;
pub mod types;
pub mod validator;

pub use config::EngineConfig;
pub use engine::{plan_scene, StrategyEngine};
pub use error::CoreError;
pub use frame::{CameraAngle, CharacterPresence, FrameDescriptor, SequenceRole, ShotType};
pub use grid::GridFormat;
pub use plan::{AnnotatedFrame, CompositeGroup, ScenePlan, Strategy, StrategyAssignment};
pub use rules::RuleId;
pub use scale::{ScaleBucket, ScaleHistory};
pub use stats::{PlanStatistics, Recommendation};

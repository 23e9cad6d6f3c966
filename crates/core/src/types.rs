/// Frame numbers are 1-based and unique within a scene.
pub type FrameNumber = u32;

/// Characters are referenced by the id the scene planner assigned them.
pub type CharacterId = String;

/// Action sequences (start → middle → end) share one id.
pub type SequenceId = String;

/// Composite group ids, e.g. `composite_001`.
pub type GroupId = String;

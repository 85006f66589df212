//! GDTF fixture profiles
//!
//! Loads profile packages, resolves the DMX channel layout of a mode and
//! builds the kinematic model a fixture is instantiated from.

mod channels;
mod kinematics;
mod profile;

pub use crate::parser::parse_description;
pub use channels::{
    AxisInfo, AxisKind, ChannelLayout, ChannelRole, ChannelSlot, ColorMixing, DmxBreak,
    FixtureCapabilities, MAX_BREAK_FOOTPRINT, VirtualChannel, collect_channels,
};
pub use kinematics::{
    KinematicModel, KinematicNode, MobileRole, ModelSource, PLACEHOLDER_SIZE, RotationConstraint,
    UNIT_SCALE_3DS, build_kinematics,
};
pub use profile::{GENERIC_PROFILE_SPEC, MAX_GOBO_ENTRIES, Profile, ProfileSource};

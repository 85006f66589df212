//! Data structures representing MVR scenes and GDTF fixture types

mod color;
mod config;
mod gdtf;
mod mvr;

pub use color::CieColor;
pub use config::{CancellationToken, DEFAULT_PROVIDER, ExportConfig, ImportConfig};
pub use gdtf::{
    BeamParams, BreakOffset, ChannelFunction, DmxChannel, DmxMode, FixtureType, Geometry,
    GeometryKind, LaserParams, LogicalChannel, Model, PrimitiveType, Revision, Wheel, WheelSlot,
};
pub use mvr::{
    Address, AuxData, Fixture, FocusPoint, Geometry3D, GeometryItem, GroupObject, Layer,
    MVR_VERSION_MAJOR, MVR_VERSION_MINOR, NamedRef, NodeHeader, NodeKind, ObjectNode,
    SceneDocument, SceneNode, Symbol, Symdef, MAX_UNIVERSE, UNIVERSE_SIZE,
};

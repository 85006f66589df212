//! XML parsing for MVR scene descriptions and GDTF fixture descriptions

mod gdtf;
mod scene;

pub use gdtf::parse_description;
pub(crate) use gdtf::parse_description_with;
pub use scene::{SCENE_ROOT, parse_scene_xml};

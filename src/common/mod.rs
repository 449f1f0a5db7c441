//! Input files shared by the command line tools.

pub mod scene;

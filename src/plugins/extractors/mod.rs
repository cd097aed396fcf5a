pub mod configured;
pub mod fallback;
pub mod generic;
pub mod pbtech;

pub use configured::SelectorExtractor;
pub use generic::GenericExtractor;
pub use pbtech::PbTechExtractor;

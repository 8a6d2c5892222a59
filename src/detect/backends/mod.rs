mod luma;
mod stub;

pub use luma::LumaBackend;
pub use stub::StubBackend;

pub mod fingerprint;
pub mod init;
pub mod open;
pub mod version;

pub use fingerprint::Fingerprint;
pub use init::Init;
pub use open::Open;
pub use version::Version;

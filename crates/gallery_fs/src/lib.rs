mod access;
mod deletion;
mod gallery;
mod samples;

pub use access::DirAccessGate;
pub use deletion::TrashDeletionService;
pub use gallery::FsGallery;
pub use samples::GeneratedSamples;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

/// Filesystem readers and writers for corpora, pair files, and split files.
pub mod fs;

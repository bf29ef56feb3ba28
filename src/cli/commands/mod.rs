pub mod sync_files;

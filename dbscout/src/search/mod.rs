/// Query matching and search coordination.
///
/// A search runs in three layers:
///
/// 1. [`QueryMatcher`] decides whether one record contains the query.
/// 2. [`FileProcessor`] walks one file's records through the matcher, stopping at a limit or
///    when the shared stop flag is raised.
/// 3. [`SearchEngine`] walks the file index, isolates per-file failures, enforces the result
///    cap and memoizes the answer.
///
/// The sequential path visits files in index order. The parallel path runs one unit per file
/// on a dedicated rayon pool:
///
/// ```rust,ignore
/// pool.install(|| {
///     files.par_iter().for_each(|file| {
///         if stop.load(Ordering::Relaxed) {
///             return;
///         }
///         let found = search_isolated(file);
///         // append under the accumulator lock, raise `stop` at the cap
///     });
/// });
/// ```
///
/// # Error Handling
///
/// Only query validation, index and pool failures reach the caller. A file that cannot be
/// opened, is malformed, or panics while being read is logged and contributes no matches:
///
/// ```rust,ignore
/// match engine.search("alice") {
///     Ok(output) => println!("{} matches", output.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub mod engine;
pub mod matcher;
pub mod processor;

pub use engine::SearchEngine;
pub use matcher::QueryMatcher;
pub use processor::FileProcessor;

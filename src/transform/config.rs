//! Configuration for the transform pipeline.
//!
//! Controls pass selection, iteration limits and the diagnostic stop-after
//! marker. Every idiom-recognition pass is independently togglable; a
//! disabled pass is simply never constructed, so the remaining passes run
//! exactly as they would otherwise.

/// Configuration consumed by [`PassPipeline`](crate::transform::PassPipeline)
/// and the [`Decompiler`](crate::decompiler::Decompiler).
///
/// # Examples
///
/// ```rust
/// use cillift::transform::PipelineConfig;
///
/// let config = PipelineConfig {
///     max_cycles: 50,
///     enable_string_switch: false,
///     ..Default::default()
/// };
/// assert!(config.enable_builder_inlining);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum pipeline cycles before convergence is declared failed
    /// (default: 20).
    pub max_cycles: usize,

    /// Maximum times a pass may report "changed" at one statement position
    /// before it is considered misbehaving (default: 8).
    pub max_position_retries: usize,

    /// Enable inlining of single-use locals holding builder-call idioms.
    pub enable_builder_inlining: bool,

    /// Enable removal of stores to never-loaded variables.
    pub enable_dead_store_elimination: bool,

    /// Enable collapsing of if/else stores into conditional expressions.
    pub enable_conditional_expressions: bool,

    /// Enable recognition of store + try/finally-dispose as using-blocks.
    pub enable_using_recognition: bool,

    /// Enable collapsing of string-equality chains into string switches.
    pub enable_string_switch: bool,

    /// Enable nested-block splicing and no-op removal.
    pub enable_block_flattening: bool,

    /// Pass documentation comments from the loader through to the output
    /// tree.
    pub emit_doc_comments: bool,

    /// Halt the pipeline after the named pass completes its sweep, for
    /// progressive/diagnostic output. Already-applied passes are not rolled
    /// back. An unknown name is rejected before the first cycle.
    pub stop_after_pass: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_cycles: 20,
            max_position_retries: 8,
            enable_builder_inlining: true,
            enable_dead_store_elimination: true,
            enable_conditional_expressions: true,
            enable_using_recognition: true,
            enable_string_switch: true,
            enable_block_flattening: true,
            emit_doc_comments: true,
            stop_after_pass: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_all_passes() {
        let config = PipelineConfig::default();
        assert!(config.enable_builder_inlining);
        assert!(config.enable_dead_store_elimination);
        assert!(config.enable_conditional_expressions);
        assert!(config.enable_using_recognition);
        assert!(config.enable_string_switch);
        assert!(config.enable_block_flattening);
        assert!(config.stop_after_pass.is_none());
        assert_eq!(config.max_cycles, 20);
        assert_eq!(config.max_position_retries, 8);
    }
}

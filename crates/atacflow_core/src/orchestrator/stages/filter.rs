//! Read filtering for peak calling and coverage.
//!
//! Keeps proper pairs with MAPQ >= 30, drops unmapped/secondary/QC-fail/
//! duplicate reads (flag 1804) and anything on or paired to chrM, and
//! optionally removes blacklisted regions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::Artifact;
use crate::models::bam_index;
use crate::orchestrator::errors::{require_file, StageError, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::samtools_index;

pub const MIN_MAPQ: &str = "30";
/// unmapped | mate unmapped | secondary | QC fail | duplicate
pub const EXCLUDE_FLAGS: &str = "1804";
/// properly paired
pub const REQUIRE_FLAGS: &str = "2";
const NO_MITO_EXPR: &str = r#"rname != "chrM" && mrname != "chrM""#;

pub struct FilterStage;

impl FilterStage {
    pub fn new() -> Self {
        Self
    }

    fn view(dedup: &Path) -> ToolCommand {
        ToolCommand::new("samtools")
            .args(["view", "-h", "-b", "-q", MIN_MAPQ, "-F", EXCLUDE_FLAGS, "-f", REQUIRE_FLAGS])
            .arg("-e")
            .arg(NO_MITO_EXPR)
            .arg(dedup)
    }

    fn sort(ctx: &Context, output: &Path) -> ToolCommand {
        ToolCommand::new("samtools")
            .args(["sort", "-@"])
            .arg(ctx.threads().to_string())
            .args(["-O", "bam", "-o"])
            .arg(output)
    }
}

impl Default for FilterStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for FilterStage {
    fn name(&self) -> &str {
        "filter"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let bam = ctx.layout.filtered_bam();
        let bai = bam_index(&bam);
        vec![Artifact::file(bam), Artifact::file(bai)]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.cleaned_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        if let Some(ref blacklist) = ctx.settings.options.blacklist_bed {
            require_file("blacklist BED", blacklist)?;
        }
        require_file("deduplicated BAM", &ctx.layout.dedup_bam())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let l = &ctx.layout;
        ctx.ensure_dir(&l.cleaned_dir())?;

        let dedup = l.dedup_bam();
        let filtered = l.filtered_bam();

        match ctx.settings.options.blacklist_bed {
            Some(ref blacklist) => {
                ctx.logger
                    .info(&format!("Applying blacklist filter: {}", blacklist.display()));
                let unsorted = l.unsorted_filtered_bam();
                let intersect = ToolCommand::new("bedtools")
                    .args(["intersect", "-v", "-abam", "stdin", "-b"])
                    .arg(blacklist)
                    .stdout_to(&unsorted);
                ctx.run_pipe(&Self::view(&dedup), &intersect)?;
                ctx.run(&Self::sort(ctx, &filtered).arg(&unsorted))?;
                fs::remove_file(&unsorted).map_err(|e| {
                    StageError::io(format!("removing {}", unsorted.display()), e)
                })?;
            }
            None => {
                ctx.run_pipe(&Self::view(&dedup), &Self::sort(ctx, &filtered).arg("-"))?;
            }
        }

        samtools_index(ctx, &filtered)
    }

    fn description(&self) -> &str {
        "Filter alignments for peak calling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn view_keeps_proper_pairs_off_chrm() {
        let view = FilterStage::view(Path::new("/d/S1_align_dedup.bam"));
        assert_eq!(
            view.render(),
            r#"samtools view -h -b -q 30 -F 1804 -f 2 -e 'rname != "chrM" && mrname != "chrM"' /d/S1_align_dedup.bam"#
        );
    }
}

//! Shared fixtures for integration tests.
//!
//! `FakeTools` stands in for the external tool chain: it records every
//! invocation and creates the files each tool would have written.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use atacflow_core::config::Settings;
use atacflow_core::logging::LogConfig;
use atacflow_core::orchestrator::SampleProcessor;
use atacflow_core::process::{render_pipe, ProcessError, ProcessResult, ToolCommand, ToolRunner};

pub const PICARD_METRICS: &str = "## htsjdk.samtools.metrics.StringHeader\n\
## METRICS CLASS\tpicard.sam.DuplicationMetrics\n\
LIBRARY\tUNPAIRED_READS_EXAMINED\tREAD_PAIRS_EXAMINED\tPERCENT_DUPLICATION\n\
lib1\t0\t1000\t0.2\n";

pub const IDXSTATS: &str = "chr1\t248956422\t90\t0\nchrM\t16569\t10\t0\n*\t0\t0\t3\n";

/// Records invocations and fakes tool outputs.
#[derive(Default)]
pub struct FakeTools {
    invocations: Mutex<Vec<String>>,
    fail_program: Option<String>,
    probe: Option<PathBuf>,
    probe_seen: Mutex<Vec<bool>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command of `program` exits with status 1.
    pub fn failing(program: &str) -> Self {
        Self {
            fail_program: Some(program.to_string()),
            ..Self::default()
        }
    }

    /// Record, for each invocation, whether `path` existed at that moment.
    pub fn probing(path: impl Into<PathBuf>) -> Self {
        Self {
            probe: Some(path.into()),
            ..Self::default()
        }
    }

    /// Also record whether `path` existed at each invocation.
    pub fn with_probe(mut self, path: impl Into<PathBuf>) -> Self {
        self.probe = Some(path.into());
        self
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.invocations.lock().len()
    }

    pub fn probe_seen(&self) -> Vec<bool> {
        self.probe_seen.lock().clone()
    }

    fn record(&self, rendered: String) {
        if let Some(ref probe) = self.probe {
            self.probe_seen.lock().push(probe.exists());
        }
        self.invocations.lock().push(rendered);
    }

    fn check(&self, command: &ToolCommand) -> ProcessResult<()> {
        match self.fail_program {
            Some(ref p) if *p == command.program_name() => {
                Err(ProcessError::tool_failure(command.render(), Some(1)))
            }
            _ => Ok(()),
        }
    }
}

impl ToolRunner for FakeTools {
    fn run(&self, command: &ToolCommand, check: bool) -> ProcessResult<i32> {
        self.record(command.render());
        if let Err(e) = self.check(command) {
            return if check { Err(e) } else { Ok(1) };
        }
        simulate(command);
        Ok(0)
    }

    fn run_pipe(&self, producer: &ToolCommand, consumer: &ToolCommand) -> ProcessResult<()> {
        self.record(render_pipe(producer, consumer));
        if self.check(producer).is_err() || self.check(consumer).is_err() {
            return Err(ProcessError::pipe_failure(
                render_pipe(producer, consumer),
                Some(1),
                Some(0),
            ));
        }
        simulate(producer);
        simulate(consumer);
        Ok(())
    }

    fn stream_lines(
        &self,
        command: &ToolCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> ProcessResult<()> {
        self.record(command.render());
        self.check(command)?;

        let args = command.arguments();
        let first = args.first().map(String::as_str);
        match (command.program_name().as_str(), first) {
            ("samtools", Some("view")) if args.iter().any(|a| a == "-c") => on_line("100"),
            ("samtools", Some("view")) => {
                for tlen in ["180", "-180", "180", "350"] {
                    on_line(&format!("r\t99\tchr1\t100\t60\t50M\t=\t300\t{}\tACGT\tIIII", tlen));
                }
            }
            ("bedtools", Some("intersect")) => {
                for i in 0..25 {
                    on_line(&format!("chr1\t{}\t{}\tr{}\t60\t+", i * 10, i * 10 + 50, i));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn touch(path: impl AsRef<Path>) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "fake\n").unwrap();
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn keyed(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .find_map(|a| a.strip_prefix(key).map(str::to_string))
}

/// Create the files `command` would produce.
fn simulate(command: &ToolCommand) {
    let args = command.arguments();
    let program = command.program_name();

    if let Some(out) = command.stdout_path() {
        if program == "samtools" && args.first().map(String::as_str) == Some("idxstats") {
            fs::write(out, IDXSTATS).unwrap();
        } else {
            touch(out);
        }
    }

    match program.as_str() {
        "samtools" => match args.first().map(String::as_str) {
            Some("sort") => {
                if let Some(out) = value_after(&args, "-o") {
                    touch(out);
                }
            }
            Some("index") => touch(format!("{}.bai", args[1])),
            _ => {}
        },
        "fastp" => {
            for flag in ["-o", "-O", "-h", "-j"] {
                if let Some(out) = value_after(&args, flag) {
                    touch(out);
                }
            }
        }
        "fastqc" => {
            let out = PathBuf::from(value_after(&args, "-o").unwrap());
            let inputs_start = args.iter().position(|a| a == "-t").unwrap() + 2;
            for input in &args[inputs_start..] {
                let name = Path::new(input).file_name().unwrap().to_string_lossy().into_owned();
                let base = name
                    .trim_end_matches(".gz")
                    .trim_end_matches(".fastq")
                    .trim_end_matches(".fq")
                    .to_string();
                touch(out.join(format!("{}_fastqc.html", base)));
                touch(out.join(format!("{}_fastqc.zip", base)));
            }
        }
        "java" if args.iter().any(|a| a == "MarkDuplicates") => {
            let out = keyed(&args, "O=").unwrap();
            touch(&out);
            // Picard names the index after the BAM minus its extension.
            touch(format!("{}.bai", out.trim_end_matches(".bam")));
            let metrics = PathBuf::from(keyed(&args, "M=").unwrap());
            fs::write(metrics, PICARD_METRICS).unwrap();
        }
        "java" => {
            if let Some(out) = keyed(&args, "O=") {
                touch(out);
            }
        }
        "bamCoverage" => touch(value_after(&args, "-o").unwrap()),
        "macs3" => {
            let name = value_after(&args, "-n").unwrap();
            let dir = PathBuf::from(value_after(&args, "--outdir").unwrap());
            touch(dir.join(format!("{}_peaks.narrowPeak", name)));
        }
        "Rscript" => {
            let sample = &args[3];
            let dir = PathBuf::from(&args[4]);
            for suffix in [
                "_Frag_sizes.png",
                "_shifted.bam",
                "_shifted.bam.bai",
                "_TSSE_enrichment_plot.png",
                "_TSSEscore.txt",
            ] {
                touch(dir.join(format!("{}{}", sample, suffix)));
            }
        }
        "multiqc" => {
            let dir = PathBuf::from(value_after(&args, "-o").unwrap());
            touch(dir.join("multiqc_report.html"));
        }
        _ => {}
    }
}

/// A scratch project: settings rooted in a temp dir, references present.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.resolve_paths(dir.path());

        let refs_dir = dir.path().join("refs");
        fs::create_dir_all(&refs_dir).unwrap();
        let script = refs_dir.join("ATACseqQC.R");
        fs::write(&script, "# R\n").unwrap();

        settings.references.bowtie2_index = Some(refs_dir.join("hg38"));
        settings.references.genome_fasta = Some(refs_dir.join("hg38.fa"));
        settings.references.picard_jar = Some(refs_dir.join("picard.jar"));
        settings.references.atacseqqc_script = Some(script);
        settings.options.threads = 4;

        Self { dir, settings }
    }

    /// Raw sample directory with one lane of paired reads.
    pub fn add_raw_sample(&self, sample: &str) -> PathBuf {
        let raw = self.settings.paths.raw_input_dir.join(sample);
        fs::create_dir_all(&raw).unwrap();
        fs::write(raw.join(format!("{}_L001_R1.fastq.gz", sample)), "r1").unwrap();
        fs::write(raw.join(format!("{}_L001_R2.fastq.gz", sample)), "r2").unwrap();
        raw
    }

    pub fn processor(&self, tools: &Arc<FakeTools>) -> SampleProcessor {
        let runner: Arc<dyn ToolRunner> = tools.clone();
        SampleProcessor::new(self.settings.clone(), runner).with_log_config(LogConfig::quiet())
    }
}

pub fn stages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub const DEFAULT_STAGES: [&str; 9] = [
    "trimming",
    "align",
    "align_qc",
    "filter",
    "coverage",
    "macs3",
    "qc",
    "ATACseqQC",
    "multiqc",
];

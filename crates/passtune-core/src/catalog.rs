use crate::error::{PassTuneError, PtResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// The LLVM 15 `opt` transformation passes the tuner draws from, in catalog
/// order. The final empty entry is a deliberate no-op slot: it lets the
/// search effectively shorten a sequence without changing its length.
const LLVM15_PASSES: &[&str] = &[
    "adce", "add-discriminators", "aggressive-instcombine", "alignment-from-assumptions",
    "always-inline", "annotation-remarks", "annotation2metadata", "assume-builder",
    "assume-simplify", "bdce", "bounds-checking", "break-crit-edges",
    "called-value-propagation", "callsite-splitting", "canon-freeze", "consthoist",
    "constmerge", "constraint-elimination", "correlated-propagation", "cross-dso-cfi",
    "dce", "deadargelim", "dfa-jump-threading", "div-rem-pairs",
    "dse", "early-cse", "elim-avail-extern", "extract-blocks",
    "fix-irreducible", "flattencfg", "float2int", "forceattrs",
    "function-attrs", "function-specialization", "globaldce", "globalopt",
    "globalsplit", "guard-widening", "gvn", "gvn-hoist",
    "gvn-sink", "hotcoldsplit", "indvars", "infer-address-spaces",
    "inferattrs", "inject-tli-mappings", "inline", "instcombine",
    "instcount", "instnamer", "instsimplify", "ipsccp",
    "irce", "iroutliner", "jump-threading", "lcssa",
    "libcalls-shrinkwrap", "load-store-vectorizer", "loop-data-prefetch", "loop-deletion",
    "loop-distribute", "loop-extract", "loop-flatten", "loop-fusion",
    "loop-idiom", "loop-instsimplify", "loop-interchange", "loop-load-elim",
    "loop-predication", "loop-reduce", "loop-reroll", "loop-rotate",
    "loop-simplify", "loop-simplifycfg", "loop-sink", "loop-unroll",
    "loop-unroll-and-jam", "loop-vectorize", "loop-versioning", "lower-constant-intrinsics",
    "lower-expect", "lower-global-dtors", "lower-guard-intrinsic", "lower-matrix-intrinsics",
    "lower-widenable-condition", "loweratomic", "lowerinvoke", "lowerswitch",
    "make-guards-explicit", "mem2reg", "memcpyopt", "mergefunc",
    "mergeicmps", "mergereturn", "mldst-motion", "nary-reassociate",
    "newgvn", "objc-arc", "objc-arc-apelim", "objc-arc-contract",
    "objc-arc-expand", "partial-inliner", "partially-inline-libcalls", "reassociate",
    "redundant-dbg-inst-elim", "reg2mem", "rewrite-statepoints-for-gc", "rewrite-symbols",
    "rpo-function-attrs", "scalarize-masked-mem-intrin", "scalarizer", "sccp",
    "separate-const-offset-from-gep", "simple-loop-unswitch", "simplifycfg", "sink",
    "slsr", "speculative-execution", "sroa", "strip",
    "strip-dead-debug-info", "strip-dead-prototypes", "strip-debug-declare", "strip-gc-relocates",
    "strip-nondebug", "strip-nonlinetable-debuginfo", "structurizecfg", "tailcallelim",
    "tlshoist", "transform-warning", "unify-loop-exits", "vector-combine",
    "verify", "",
];

/// An ordered, immutable list of pass names. Its length and order define the
/// per-position bounds of the search space, so the catalog is part of a run's
/// reproducibility contract: archives keyed against one catalog are
/// meaningless under another.
#[derive(Debug, Clone)]
pub struct PassCatalog {
    passes: Vec<String>,
}

impl PassCatalog {
    /// Build a catalog from an explicit name list.
    pub fn new(passes: Vec<String>) -> PtResult<Self> {
        if passes.is_empty() {
            return Err(PassTuneError::Catalog("catalog must not be empty".into()));
        }
        Ok(Self { passes })
    }

    /// The built-in LLVM 15 catalog.
    pub fn default_llvm() -> Self {
        Self {
            passes: LLVM15_PASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load a catalog from a plain text file, one pass name per line.
    /// Blank lines and `#` comments are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PtResult<Self> {
        let content = fs::read_to_string(&path)?;
        let passes: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();

        if passes.is_empty() {
            return Err(PassTuneError::Catalog(format!(
                "catalog file '{}' contains no pass names",
                path.as_ref().display()
            )));
        }

        Ok(Self { passes })
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.passes.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(String::as_str)
    }

    /// Deterministic identity of the search landscape this catalog spans:
    /// a SHA-256 over every pass name (in order) and the sequence length.
    /// Stored next to fitness archives so a resumed run can detect that it
    /// is about to reuse scores from an incompatible landscape.
    pub fn fingerprint(&self, sequence_length: usize) -> String {
        let mut hasher = Sha256::new();
        for name in &self.passes {
            hasher.update(name.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(sequence_length.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

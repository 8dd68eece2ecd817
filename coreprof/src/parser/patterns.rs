//! Line patterns of the Core Profiler trace format
//!
//! Every pattern is anchored on both ends and applied to a line with its
//! trailing whitespace already stripped. Repeated tail groups (frames,
//! allocations, GC items, code groups) are captured as one substring by the
//! line pattern and split afterwards by the matching `*_ITEM` sub-pattern.

use regex::Regex;
use std::sync::LazyLock;

/// Compile a pattern that is part of the binary
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid trace line pattern")
}

// ============================================================================
// High-frequency records (tried first)
// ============================================================================

/// `sam str <tid> <ts> <count> <prefix>:<size>[:[0xip]] [0xfunc[:0xip]]*`
pub static STACK_SAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^sam\s+str\s+0[xX]([0-9a-fA-F]+)\s+(\d+)\s+(\d+)\s+(\d+):(\d+)(:(?:0[xX]([0-9a-fA-F]+))?)?((?:\s+0[xX][0-9a-fA-F]+(?::0[xX][0-9a-fA-F]+)?)*)$",
    )
});

/// One pushed frame inside a stack sample tail
pub static STACK_FRAME_ITEM: LazyLock<Regex> =
    LazyLock::new(|| compile(r"0[xX]([0-9a-fA-F]+)(?::0[xX]([0-9a-fA-F]+))?"));

/// `sam mem <tid> <ts> [0xclass:count:size[:0xip]]*`
pub static ALLOCATION_SAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^sam\s+mem\s+0[xX]([0-9a-fA-F]+)\s+(\d+)((?:\s+0[xX][0-9a-fA-F]+:\d+:\d+(?::0[xX][0-9a-fA-F]+)?)*)$",
    )
});

/// One allocation entry inside an allocation sample tail
pub static ALLOCATION_ITEM: LazyLock<Regex> =
    LazyLock::new(|| compile(r"0[xX]([0-9a-fA-F]+):(\d+):(\d+)(?::0[xX]([0-9a-fA-F]+))?"));

// ============================================================================
// Reference and bookkeeping records
// ============================================================================

pub static GC_SAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^gch\s+alt\s+(\d+)((?:\s+0[xX][0-9a-fA-F]+:\d+:\d+)*)$")
});

pub static GC_ITEM: LazyLock<Regex> =
    LazyLock::new(|| compile(r"0[xX]([0-9a-fA-F]+):(\d+):(\d+)"));

/// Names may be bare or quoted
pub static APP_DOMAIN_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"^apd\s+crf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+(?:"([^"]*)"|(.*))$"#,
    )
});

pub static ASSEMBLY_LOADED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"^asm\s+ldf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+(?:"([^"]*)"|(.*))$"#,
    )
});

pub static MODULE_LOADED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"^mod\s+ldf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+"([^"]*)"$"#,
    )
});

pub static MODULE_ATTACHED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^mod\s+ata\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)$")
});

pub static CLASS_NAMED: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"^cls\s+nam\s+0[xX]([0-9a-fA-F]+)\s+"([^"]*)"$"#));

pub static CLASS_LOADED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^cls\s+ldf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)$",
    )
});

pub static FUNCTION_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"^fun\s+nam\s+0[xX]([0-9a-fA-F]+)\s+"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"$"#)
});

pub static FUNCTION_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^fun\s+cmf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)((?:\s+0[xX][0-9a-fA-F]+:0[xX][0-9a-fA-F]+(?::0[xX][0-9a-fA-F]+)?)*)$",
    )
});

pub static CACHED_FUNCTION_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^fun\s+csf\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)((?:\s+0[xX][0-9a-fA-F]+:0[xX][0-9a-fA-F]+(?::0[xX][0-9a-fA-F]+)?)*)$",
    )
});

/// Code range (2 parts) or sequence point (3 parts) inside a function tail
pub static CODE_GROUP_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"0[xX]([0-9a-fA-F]+):0[xX]([0-9a-fA-F]+)(?::0[xX]([0-9a-fA-F]+))?")
});

pub static SOURCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^lin\s+src\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)$",
    )
});

pub static SOURCE_FILE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"^fil\s+src\s+0[xX]([0-9a-fA-F]+)\s+"([^"]*)"$"#));

pub static PROCESS_CPU: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^prc\s+cpu\s+(\d+)\s+(\d+)$"));

pub static TIMESTAMP_SCALE: LazyLock<Regex> = LazyLock::new(|| compile(r"^prf\s+tps\s+(\d+)$"));

pub static TIME_REFERENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"^prf\s+trs\s+(\d+)$"));

pub static THREAD_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^thr\s+crt\s+0[xX]([0-9a-fA-F]+)\s+0[xX]([0-9a-fA-F]+)$")
});

pub static THREAD_DESTROYED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^thr\s+dst\s+0[xX]([0-9a-fA-F]+)$"));

pub static THREAD_OS_ASSIGNED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^thr\s+aos\s+0[xX]([0-9a-fA-F]+)\s+(\d+)$"));

pub static THREAD_CPU: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^thr\s+cpu\s+0[xX]([0-9a-fA-F]+)\s+(\d+)\s+(\d+)$"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_sample_pattern_captures_tail() {
        let caps = STACK_SAMPLE.captures("sam str 0x1 200 1 1:3:0x40 0x20 0x30:0x7").unwrap();
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[4], "1");
        assert_eq!(&caps[5], "3");
        assert_eq!(&caps[7], "40");
        assert_eq!(&caps[8], " 0x20 0x30:0x7");
    }

    #[test]
    fn test_stack_sample_pattern_accepts_empty_marker() {
        let caps = STACK_SAMPLE.captures("sam str 0x1 200 1 1:1:").unwrap();
        assert_eq!(&caps[6], ":");
        assert!(caps.get(7).is_none());
    }

    #[test]
    fn test_allocation_pattern_rejects_hex_count() {
        assert!(ALLOCATION_SAMPLE.is_match("sam mem 0x2 10 0x5:3:96"));
        assert!(!ALLOCATION_SAMPLE.is_match("sam mem 0x2 10 0x5:0x3:96"));
    }

    #[test]
    fn test_bare_and_quoted_domain_names() {
        let bare = APP_DOMAIN_CREATED.captures("apd crf 0x1 0x2 0x0 DefaultDomain").unwrap();
        assert_eq!(bare.get(5).map(|m| m.as_str()), Some("DefaultDomain"));

        let quoted = APP_DOMAIN_CREATED.captures(r#"apd crf 0x1 0x2 0x0 "My Domain""#).unwrap();
        assert_eq!(quoted.get(4).map(|m| m.as_str()), Some("My Domain"));
    }
}

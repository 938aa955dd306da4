use once_cell::sync::Lazy;
use regex::RegexSet;

// Filenames produced by operating systems and editors, never user content.
static JUNK_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // npm
        r"^npm-debug\.log$",
        // vim swap files
        r"^\..*\.sw[a-p]$",
        r"\.swp$",
        // emacs backups and lock files
        r"~$",
        r"^\.#",
        // macOS
        r"^\.DS_Store$",
        r"^\.AppleDouble$",
        r"^\.LSOverride$",
        "^Icon\r$",
        r"^\._",
        r"^\.Spotlight-V100$",
        r"^\.Trashes$",
        r"^__MACOSX$",
        r"^\.fseventsd$",
        r"^\.DocumentRevisions-V100$",
        r"^\.TemporaryItems$",
        r"^\.VolumeIcon\.icns$",
        // Linux
        r"^\.Trash-",
        r"^\.nfs",
        r"^\.directory$",
        // Windows
        r"^Thumbs\.db$",
        r"^ehthumbs\.db$",
        r"^[Dd]esktop\.ini$",
        r"^\$RECYCLE\.BIN$",
        // Synology
        r"@eaDir$",
    ])
    .expect("junk patterns are valid regexes")
});

pub fn is_junk(file_name: &str) -> bool {
    JUNK_PATTERNS.is_match(file_name)
}

pub fn is_not_junk(file_name: &str) -> bool {
    !is_junk(file_name)
}

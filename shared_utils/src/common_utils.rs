//! Common Utilities Module
//!
//! 通用工具函数集合：
//! - 文件扩展名辅助函数
//! - 文件名清理（URL 派生的名称）

use std::path::Path;

// ═══════════════════════════════════════════════════════════════
// 文件操作工具 (File Operations)
// ═══════════════════════════════════════════════════════════════

/// 安全地获取文件扩展名（小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 检查文件扩展名是否在给定列表中（不区分大小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["jpg", "png"];
/// assert!(has_extension(Path::new("photo.JPG"), extensions));
/// assert!(!has_extension(Path::new("notes.txt"), extensions));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

// ═══════════════════════════════════════════════════════════════
// 文件名清理 (File Name Sanitization)
// ═══════════════════════════════════════════════════════════════

/// Characters that are invalid in a file name on at least one supported platform.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback name when sanitization leaves nothing usable.
pub const FALLBACK_FILE_NAME: &str = "file";

fn is_invalid_name_char(c: char) -> bool {
    INVALID_NAME_CHARS.contains(&c) || (c as u32) < 0x20
}

/// Turn an arbitrary (URL-derived) name into a usable file name.
///
/// Invalid characters and ASCII control characters become `_`, trailing dots
/// and spaces are stripped, and an empty result falls back to `"file"`.
///
/// # Examples
/// ```
/// use shared_utils::common_utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("a<b>c"), "a_b_c");
/// assert_eq!(sanitize_file_name("name. . "), "name");
/// assert_eq!(sanitize_file_name("   "), "file");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    let replaced: String = trimmed
        .chars()
        .map(|c| if is_invalid_name_char(c) { '_' } else { c })
        .collect();

    let cleaned = replaced.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

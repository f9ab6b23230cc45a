use ustr::Ustr;

/// MIME types a drop surface accepts by default.
pub const DEFAULT_ACCEPTED_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/tiff", "image/gif"];

/// Owner-supplied configuration for one upload field, fixed for the lifetime
/// of its [`crate::UploadManager`].
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Maximum number of stored files. `1` selects single-file semantics
    /// (a new drop replaces the current file); anything larger appends.
    pub max_slots: usize,
    /// Endpoint each file is POSTed to, one multipart request per file.
    pub upload_url: Ustr,
    /// Multipart field name the file bytes are attached under.
    pub field_name: Ustr,
    /// URL prefix for files committed in this session (temporary storage).
    pub temp_image_url: Ustr,
    /// URL prefix for files already attached to the record (real storage).
    pub real_image_url: Ustr,
    /// Filenames committed to the record before this editing session.
    pub initial_files: Vec<String>,
    /// Accepted MIME types for the drop surface.
    pub accepted_types: Vec<Ustr>,
}

impl UploaderConfig {
    pub fn new(
        max_slots: usize,
        upload_url: &str,
        field_name: &str,
        temp_image_url: &str,
        real_image_url: &str,
    ) -> Self {
        Self {
            max_slots: max_slots.max(1),
            upload_url: Ustr::from(upload_url),
            field_name: Ustr::from(field_name),
            temp_image_url: Ustr::from(temp_image_url),
            real_image_url: Ustr::from(real_image_url),
            initial_files: Vec::new(),
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().copied().map(Ustr::from).collect(),
        }
    }

    /// Seed the batch with files already attached to the record.
    pub fn with_initial_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.initial_files = files.into_iter().collect();
        self
    }

    pub fn with_accepted_types(mut self, types: impl IntoIterator<Item = Ustr>) -> Self {
        self.accepted_types = types.into_iter().collect();
        self
    }

    /// Whether this field stores more than one file.
    pub fn is_multiple(&self) -> bool {
        self.max_slots > 1
    }

    /// Preview URL for a filename freshly committed in this session.
    pub fn temp_preview_url(&self, filename: &str) -> String {
        format!("{}/{filename}", self.temp_image_url)
    }

    /// Preview URL for a pre-existing filename.
    pub fn real_preview_url(&self, filename: &str) -> String {
        format!("{}/{filename}", self.real_image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_slots: usize) -> UploaderConfig {
        UploaderConfig::new(
            max_slots,
            "http://localhost:3001/api/admin/teams/upload/flagIcon",
            "flagIcon",
            "http://localhost:3001/tmp",
            "http://localhost:3001/img",
        )
    }

    #[test]
    fn max_slots_is_never_zero() {
        assert_eq!(config(0).max_slots, 1);
    }

    #[test]
    fn single_vs_multiple() {
        assert!(!config(1).is_multiple());
        assert!(config(3).is_multiple());
    }

    #[test]
    fn preview_urls_join_with_slash() {
        let cfg = config(1);
        assert_eq!(cfg.temp_preview_url("a.png"), "http://localhost:3001/tmp/a.png");
        assert_eq!(cfg.real_preview_url("a.png"), "http://localhost:3001/img/a.png");
    }

    #[test]
    fn default_accepted_types_are_images() {
        let cfg = config(1);
        assert!(cfg.accepted_types.iter().any(|t| t.as_str() == "image/png"));
        assert_eq!(cfg.accepted_types.len(), 4);
    }
}

//! Image embedding for merged documents
//!
//! Each picture found in a content document becomes a centered image
//! paragraph followed by a centered `Figure N` caption. Pictures in a
//! format Word cannot show are re-encoded to PNG first; when that is not
//! possible the picture is skipped and the caller counts it.

use std::collections::{HashMap, HashSet};

use docweave_ast::{Alignment, Extent};
use sha2::{Digest, Sha256};

use crate::content_types::ContentTypes;
use crate::image::{
    self, content_type_for_extension, extension_for_mime, is_supported_mime, sniff_mime, Drawing,
    ImageInfo,
};
use crate::relationships::Relationships;
use crate::writer::BodyXml;

/// Caption label preceding the figure ordinal
pub const FIGURE_LABEL: &str = "Figure";

/// Prefix of media parts added by the merge
pub const MEDIA_PREFIX: &str = "word/media/docweave_image";

/// Monotonic caption ordinal, scoped to one merge
#[derive(Debug, Clone, Default)]
pub struct FigureCounter {
    last: u32,
}

impl FigureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordinal of the most recently inserted figure, 0 before the first
    pub fn current(&self) -> u32 {
        self.last
    }

    /// Claim the next ordinal
    pub fn advance(&mut self) -> u32 {
        self.last += 1;
        self.last
    }
}

/// Why a picture was not embedded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Format outside the supported set and re-encoding failed
    ReencodeFailed { mime: String },
    /// Format outside the supported set and no re-encoder is built in
    ConversionUnavailable { mime: String },
    /// Bytes are not a recognizable image
    Unreadable { mime: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ReencodeFailed { mime } => write!(f, "cannot re-encode {} to PNG", mime),
            SkipReason::ConversionUnavailable { mime } => {
                write!(f, "{} needs conversion, but raster support is disabled", mime)
            }
            SkipReason::Unreadable { mime } => write!(f, "{} data is not a readable image", mime),
        }
    }
}

/// Result of one embedding attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOutcome {
    Inserted { ordinal: u32 },
    Skipped(SkipReason),
}

impl EmbedOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, EmbedOutcome::Inserted { .. })
    }
}

/// A picture extracted from a content document
#[derive(Debug, Clone, Copy)]
pub struct ImageSource<'a> {
    pub bytes: &'a [u8],
    /// Rendered size declared by the source drawing
    pub declared_extent: Option<Extent>,
    pub mime: &'a str,
}

/// Presentation settings shared by every embedded picture
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Apply the border and shadow treatment
    pub decorate: bool,
    /// Template style id for captions
    pub caption_style_id: Option<String>,
}

/// Destination package state for new media: relationships, content types,
/// media parts and drawing ids
#[derive(Debug, Clone)]
pub struct MediaSink {
    relationships: Relationships,
    content_types: ContentTypes,
    media: Vec<(String, Vec<u8>)>,
    /// SHA-256 of the bytes -> relationship id
    by_digest: HashMap<Vec<u8>, String>,
    taken_parts: HashSet<String>,
    next_media_index: u32,
    next_doc_pr_id: u32,
}

impl MediaSink {
    /// Continue after the destination's existing parts and highest `docPr` id
    pub fn new<'p>(
        relationships: Relationships,
        content_types: ContentTypes,
        existing_parts: impl IntoIterator<Item = &'p str>,
        max_doc_pr_id: u32,
    ) -> Self {
        Self {
            relationships,
            content_types,
            media: Vec::new(),
            by_digest: HashMap::new(),
            taken_parts: existing_parts.into_iter().map(str::to_string).collect(),
            next_media_index: 1,
            next_doc_pr_id: max_doc_pr_id + 1,
        }
    }

    /// Store a media part once per distinct byte content and return its relationship id
    pub fn add_media(&mut self, bytes: &[u8], mime: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize().to_vec();
        if let Some(rel_id) = self.by_digest.get(&digest) {
            return rel_id.clone();
        }

        let extension = extension_for_mime(mime);
        let part = loop {
            let candidate = format!("{}{}.{}", MEDIA_PREFIX, self.next_media_index, extension);
            self.next_media_index += 1;
            if !self.taken_parts.contains(&candidate) {
                break candidate;
            }
        };

        let content_type = match content_type_for_extension(extension) {
            "application/octet-stream" => mime,
            known => known,
        };
        self.content_types.ensure_default(extension, content_type);

        let target = part.trim_start_matches("word/").to_string();
        let rel_id = self.relationships.add(target, Relationships::TYPE_IMAGE);
        log::debug!("embedded {} bytes as {} ({})", bytes.len(), part, rel_id);

        self.taken_parts.insert(part.clone());
        self.media.push((part, bytes.to_vec()));
        self.by_digest.insert(digest, rel_id.clone());
        rel_id
    }

    /// Claim a fresh `wp:docPr` id
    pub fn next_doc_pr_id(&mut self) -> u32 {
        let id = self.next_doc_pr_id;
        self.next_doc_pr_id += 1;
        id
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Media parts added so far, as (package path, bytes)
    pub fn media(&self) -> &[(String, Vec<u8>)] {
        &self.media
    }

    pub(crate) fn into_parts(self) -> (Relationships, ContentTypes, Vec<(String, Vec<u8>)>) {
        (self.relationships, self.content_types, self.media)
    }
}

/// Embed one picture into `container` after whatever it already holds.
///
/// On success the container gains an image paragraph and a caption, and the
/// figure counter advances. A skipped picture leaves both untouched.
pub fn embed(
    container: &mut BodyXml,
    sink: &mut MediaSink,
    counter: &mut FigureCounter,
    source: &ImageSource<'_>,
    options: &EmbedOptions,
) -> EmbedOutcome {
    let converted;
    let (bytes, mime) = if is_supported_mime(source.mime) {
        (source.bytes, source.mime)
    } else {
        match image::reencode_to_png(source.bytes) {
            Some(png) => {
                log::debug!("re-encoded {} image to PNG", source.mime);
                converted = png;
                (converted.as_slice(), "image/png")
            }
            None => {
                let mime = source.mime.to_string();
                let reason = if cfg!(feature = "raster") {
                    SkipReason::ReencodeFailed { mime }
                } else {
                    SkipReason::ConversionUnavailable { mime }
                };
                log::warn!("skipping image: {}", reason);
                return EmbedOutcome::Skipped(reason);
            }
        }
    };

    let info = ImageInfo::probe(bytes);
    if info.is_none() && sniff_mime(bytes).is_none() {
        let reason = SkipReason::Unreadable {
            mime: mime.to_string(),
        };
        log::warn!("skipping image: {}", reason);
        return EmbedOutcome::Skipped(reason);
    }

    let extent = image::target_extent(source.declared_extent, info.as_ref());
    let rel_id = sink.add_media(bytes, mime);
    let doc_pr_id = sink.next_doc_pr_id();
    let ordinal = counter.advance();
    let name = format!("Picture {}", doc_pr_id);

    container.open_paragraph(None, Some(Alignment::Center), None);
    container.drawing_run(&Drawing {
        rel_id: &rel_id,
        doc_pr_id,
        name: &name,
        description: "",
        extent,
        decorated: options.decorate,
    });
    container.close_paragraph();

    container.text_paragraph(
        &format!("{} {}", FIGURE_LABEL, ordinal),
        options.caption_style_id.as_deref(),
        Some(Alignment::Center),
    );

    EmbedOutcome::Inserted { ordinal }
}

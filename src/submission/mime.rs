//! Extension to MIME type lookup for multipart part headers.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Type sent for unknown or missing extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Apache `mime.types` entries, minus the `application/*` and `vnd.*`
/// families, plus the few application types form submissions carry.
const MIME_TYPES: &[(&str, &str)] = &[
    ("3g2", "video/3gpp2"),
    ("3gp", "video/3gpp"),
    ("3gpp", "audio/3gpp"),
    ("aac", "audio/x-aac"),
    ("adp", "audio/adpcm"),
    ("aif", "audio/x-aiff"),
    ("aifc", "audio/x-aiff"),
    ("aiff", "audio/x-aiff"),
    ("asf", "video/x-ms-asf"),
    ("asm", "text/x-asm"),
    ("asx", "video/x-ms-asf"),
    ("au", "audio/basic"),
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("btif", "image/prs.btif"),
    ("c", "text/x-c"),
    ("cc", "text/x-c"),
    ("cdx", "chemical/x-cdx"),
    ("cgm", "image/cgm"),
    ("cif", "chemical/x-cif"),
    ("cmdf", "chemical/x-cmdf"),
    ("cml", "chemical/x-cml"),
    ("cmx", "image/x-cmx"),
    ("conf", "text/plain"),
    ("cpp", "text/x-c"),
    ("csml", "chemical/x-csml"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("cxx", "text/x-c"),
    ("def", "text/plain"),
    ("dic", "text/x-c"),
    ("dsc", "text/prs.lines.tag"),
    ("eml", "message/rfc822"),
    ("etx", "text/x-setext"),
    ("f", "text/x-fortran"),
    ("f4v", "video/x-f4v"),
    ("f77", "text/x-fortran"),
    ("f90", "text/x-fortran"),
    ("fh", "image/x-freehand"),
    ("fh4", "image/x-freehand"),
    ("fh5", "image/x-freehand"),
    ("fh7", "image/x-freehand"),
    ("fhc", "image/x-freehand"),
    ("fli", "video/x-fli"),
    ("flv", "video/x-flv"),
    ("for", "text/x-fortran"),
    ("g3", "image/g3fax"),
    ("gif", "image/gif"),
    ("h", "text/x-c"),
    ("h261", "video/h261"),
    ("h263", "video/h263"),
    ("h264", "video/h264"),
    ("hh", "text/x-c"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ice", "x-conference/x-cooltalk"),
    ("ico", "image/x-icon"),
    ("ics", "text/calendar"),
    ("ief", "image/ief"),
    ("ifb", "text/calendar"),
    ("iges", "model/iges"),
    ("igs", "model/iges"),
    ("in", "text/plain"),
    ("jar", "application/java-archive"),
    ("java", "text/x-java-source"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("jpgm", "video/jpm"),
    ("jpgv", "video/jpeg"),
    ("jpm", "video/jpm"),
    ("js", "application/javascript"),
    ("kar", "audio/midi"),
    ("list", "text/plain"),
    ("log", "text/plain"),
    ("m1v", "video/mpeg"),
    ("m2a", "audio/mpeg"),
    ("m2v", "video/mpeg"),
    ("m3a", "audio/mpeg"),
    ("m3u", "audio/x-mpegurl"),
    ("m4v", "video/x-m4v"),
    ("man", "text/troff"),
    ("me", "text/troff"),
    ("mesh", "model/mesh"),
    ("mid", "audio/midi"),
    ("midi", "audio/midi"),
    ("mime", "message/rfc822"),
    ("mj2", "video/mj2"),
    ("mjp2", "video/mj2"),
    ("mov", "video/quicktime"),
    ("movie", "video/x-sgi-movie"),
    ("mp2", "audio/mpeg"),
    ("mp2a", "audio/mpeg"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mp4a", "audio/mp4"),
    ("mp4v", "video/mp4"),
    ("mpe", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("mpg4", "video/mp4"),
    ("mpga", "audio/mpeg"),
    ("ms", "text/troff"),
    ("msh", "model/mesh"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("p", "text/x-pascal"),
    ("pas", "text/x-pascal"),
    ("pbm", "image/x-portable-bitmap"),
    ("pct", "image/x-pict"),
    ("pcx", "image/x-pcx"),
    ("pgm", "image/x-portable-graymap"),
    ("pic", "image/x-pict"),
    ("png", "image/png"),
    ("pnm", "image/x-portable-anymap"),
    ("ppm", "image/x-portable-pixmap"),
    ("qt", "video/quicktime"),
    ("ra", "audio/x-pn-realaudio"),
    ("ram", "audio/x-pn-realaudio"),
    ("ras", "image/x-cmu-raster"),
    ("rgb", "image/x-rgb"),
    ("rmi", "audio/midi"),
    ("rmp", "audio/x-pn-realaudio-plugin"),
    ("roff", "text/troff"),
    ("rtx", "text/richtext"),
    ("s", "text/x-asm"),
    ("sgm", "text/sgml"),
    ("sgml", "text/sgml"),
    ("silo", "model/mesh"),
    ("snd", "audio/basic"),
    ("spx", "audio/ogg"),
    ("svg", "image/svg+xml"),
    ("svgz", "image/svg+xml"),
    ("t", "text/troff"),
    ("text", "text/plain"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("tr", "text/troff"),
    ("tsv", "text/tab-separated-values"),
    ("txt", "text/plain"),
    ("uri", "text/uri-list"),
    ("uris", "text/uri-list"),
    ("urls", "text/uri-list"),
    ("uu", "text/x-uuencode"),
    ("vcf", "text/x-vcard"),
    ("vcs", "text/x-vcalendar"),
    ("vrml", "model/vrml"),
    ("wav", "audio/x-wav"),
    ("wax", "audio/x-ms-wax"),
    ("wm", "video/x-ms-wm"),
    ("wma", "audio/x-ms-wma"),
    ("wmv", "video/x-ms-wmv"),
    ("wmx", "video/x-ms-wmx"),
    ("wrl", "model/vrml"),
    ("wvx", "video/x-ms-wvx"),
    ("xbm", "image/x-xbitmap"),
    ("xhtml", "application/xhtml+xml"),
    ("xml", "application/xml"),
    ("xpm", "image/x-xpixmap"),
    ("xsl", "application/xml"),
    ("xslt", "application/xslt+xml"),
    ("xwd", "image/x-xwindowdump"),
    ("xyz", "chemical/x-xyz"),
    ("zip", "application/zip"),
];

fn registry() -> &'static HashMap<&'static str, &'static str> {
    static REGISTRY: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    REGISTRY.get_or_init(|| MIME_TYPES.iter().copied().collect())
}

/// Extension of a file name: text after the last `.`, lower-cased.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// MIME type for a file name, falling back to [`OCTET_STREAM`].
pub fn mime_type(file_name: &str) -> &'static str {
    extension(file_name)
        .and_then(|ext| registry().get(ext.as_str()).copied())
        .unwrap_or(OCTET_STREAM)
}

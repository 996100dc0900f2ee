/// Extract the filename to materialize on disk from a source/patch
/// location.
///
/// Plain filenames are returned as-is. For URLs the final path segment is
/// used, with fragments honored the way RPM downloaders treat them: a
/// fragment containing a slash overrides the path (`...cgi#/name.tar.gz`,
/// `...#/file=name.tar.gz`), while a plain fragment stays attached to the
/// basename. Returns an empty string when the location carries no filename
/// at all.
pub fn filename_from_location(location: &str) -> String {
    let (rest, fragment) = match location.split_once('#') {
        Some((rest, fragment)) => (rest, fragment),
        None => (location, ""),
    };
    let path = path_part(rest);
    let basename = |s: &str| s.rsplit('/').next().unwrap_or(s).to_string();
    if !fragment.is_empty() {
        if fragment.contains('/') {
            let name = basename(fragment);
            return name.rsplit('=').next().unwrap_or(&name).to_string();
        }
        let name = basename(path);
        if name.is_empty() {
            return String::new();
        }
        return format!("{name}#{fragment}");
    }
    basename(path)
}

/// The path component of a location: everything after the authority for
/// URLs, minus any query string.
fn path_part(rest: &str) -> &str {
    let path = match rest.find("://") {
        Some(idx) => {
            let after_scheme = &rest[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "",
            }
        }
        None => rest,
    };
    path.split('?').next().unwrap_or(path)
}

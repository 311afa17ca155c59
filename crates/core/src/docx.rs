use crate::error::IngestError;
use crate::models::{Document, DocumentMetadata};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

const MAIN_PART: &str = "word/document.xml";

/// Reads a `.docx` container as a single document.
///
/// Header parts come first, then the main document, then footer parts.
pub fn extract_docx(path: &Path) -> Result<Vec<Document>, IngestError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let headers = numbered_parts(&archive, "word/header");
    let footers = numbered_parts(&archive, "word/footer");
    let parts = headers
        .iter()
        .map(String::as_str)
        .chain([MAIN_PART])
        .chain(footers.iter().map(String::as_str));

    let mut text = String::new();
    for part in parts {
        let xml = read_part(&mut archive, part)?;
        text.push_str(&document_xml_to_text(&xml)?);
    }

    Ok(vec![Document::new(text, DocumentMetadata::text(path))])
}

/// Part names like `word/header2.xml`, ordered by their number.
fn numbered_parts(archive: &ZipArchive<File>, prefix: &str) -> Vec<String> {
    let mut names = archive
        .file_names()
        .filter(|name| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(".xml"))
                .is_some_and(|digits| {
                    !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit())
                })
        })
        .map(str::to_string)
        .collect::<Vec<_>>();
    names.sort_by(|left, right| left.len().cmp(&right.len()).then_with(|| left.cmp(right)));
    names
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<String, IngestError> {
    let mut xml = String::new();
    archive
        .by_name(name)
        .map_err(|error| IngestError::DocxParse(format!("{name}: {error}")))?
        .read_to_string(&mut xml)?;
    Ok(xml)
}

/// Flattens WordprocessingML into plain text.
///
/// Runs are concatenated, `w:tab` becomes a tab, `w:br` and `w:cr` a newline,
/// and every paragraph is closed by a blank line.
pub fn document_xml_to_text(xml: &str) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                if element.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Event::Empty(element) => match element.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(content) => {
                if in_text_run {
                    let unescaped = content
                        .unescape()
                        .map_err(|error| IngestError::DocxParse(error.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    pub(crate) fn paragraphs_xml(paragraphs: &[&str]) -> String {
        let body = paragraphs
            .iter()
            .map(|paragraph| {
                format!("<w:p><w:r><w:t xml:space=\"preserve\">{paragraph}</w:t></w:r></w:p>")
            })
            .collect::<String>();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        )
    }

    fn write_parts(
        path: &Path,
        parts: &[(&str, &str)],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = zip::ZipWriter::new(File::create(path)?);
        writer.start_file("[Content_Types].xml", SimpleFileOptions::default())?;
        writer.write_all(b"<?xml version=\"1.0\"?><Types/>")?;
        for (name, xml) in parts {
            writer.start_file(*name, SimpleFileOptions::default())?;
            writer.write_all(xml.as_bytes())?;
        }
        writer.finish()?;
        Ok(())
    }

    pub(crate) fn write_docx(
        path: &Path,
        document_xml: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        write_parts(path, &[(MAIN_PART, document_xml)])
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() -> Result<(), IngestError> {
        let text = document_xml_to_text(&paragraphs_xml(&["First", "Second"]))?;
        assert_eq!(text, "First\n\nSecond\n\n");
        Ok(())
    }

    #[test]
    fn tabs_breaks_and_entities_are_decoded() -> Result<(), IngestError> {
        let xml = "<w:document xmlns:w=\"w\"><w:body><w:p>\
                   <w:r><w:t>Name</w:t><w:tab/><w:t>A &amp; B</w:t><w:br/><w:t>next</w:t></w:r>\
                   </w:p></w:body></w:document>";
        let text = document_xml_to_text(xml)?;
        assert_eq!(text, "Name\tA & B\nnext\n\n");
        Ok(())
    }

    #[test]
    fn text_outside_runs_is_ignored() -> Result<(), IngestError> {
        let xml = "<w:document xmlns:w=\"w\"><w:body><w:p><w:instrText>PAGE</w:instrText>\
                   <w:r><w:t>kept</w:t></w:r></w:p></w:body></w:document>";
        assert_eq!(document_xml_to_text(xml)?, "kept\n\n");
        Ok(())
    }

    #[test]
    fn extract_docx_reads_main_part() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("report.docx");
        write_docx(&path, &paragraphs_xml(&["Quarterly report", "Revenue grew."]))?;

        let documents = extract_docx(&path)?;

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "Quarterly report\n\nRevenue grew.\n\n");
        assert_eq!(documents[0].metadata.source, path);
        Ok(())
    }

    #[test]
    fn headers_and_footers_wrap_the_main_part() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("letter.docx");
        let header = paragraphs_xml(&["Acme Corp"]);
        let second_header = paragraphs_xml(&["Draft"]);
        let body = paragraphs_xml(&["Dear customer,"]);
        let footer = paragraphs_xml(&["Confidential"]);
        write_parts(
            &path,
            &[
                ("word/footer1.xml", footer.as_str()),
                (MAIN_PART, body.as_str()),
                ("word/header2.xml", second_header.as_str()),
                ("word/header1.xml", header.as_str()),
                ("word/headerstyles.xml", "<w:hdr/>"),
            ],
        )?;

        let documents = extract_docx(&path)?;

        assert_eq!(
            documents[0].text,
            "Acme Corp\n\nDraft\n\nDear customer,\n\nConfidential\n\n"
        );
        Ok(())
    }

    #[test]
    fn missing_main_part_is_a_docx_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("partial.docx");
        let header = paragraphs_xml(&["Only a header"]);
        write_parts(&path, &[("word/header1.xml", header.as_str())])?;

        assert!(matches!(extract_docx(&path), Err(IngestError::DocxParse(_))));
        Ok(())
    }

    #[test]
    fn non_zip_file_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"not a zip archive")?;

        assert!(matches!(extract_docx(&path), Err(IngestError::Zip(_))));
        Ok(())
    }
}

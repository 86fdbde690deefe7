//! Quiz packaging: bundle cut images into an IMS QTI 1.2 content package.
//!
//! The packager knows nothing about PDFs. It finds questions in a directory
//! purely through the naming contract of [`crate::pipeline::naming`]:
//! question `n` is `{name}{n:02}{suffix}.png` and its choices are
//! `{name}{n:02}{k}.png` for each `k` of the configured choice pattern.
//! Probing stops at the first missing question image.
//!
//! The archive, `{name}({count}).zip`, contains
//!
//! ```text
//! imsmanifest.xml
//! {assessment_id}/{assessment_id}.xml   QTI assessment, one item per question
//! {media_dir}/{image}.png               every collected image
//! ```
//!
//! Every question is single-choice and scores 100 when the choice at
//! `correct_choice_index` is picked.

use crate::config::PackageConfig;
use crate::error::CutError;
use crate::output::PackageOutput;
use crate::pipeline::naming::{choice_file_name, question_file_name};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const SCHEMA_VERSION: &str = "1.1.3";
const ASSESSMENT_TYPE: &str = "imsqti_xmlv1p2";
const QUESTION_TYPE: &str = "multiple_choice_question";
const QTI_NAMESPACE: &str = "http://www.imsglobal.org/xsd/ims_qtiasiv1p2";
const MANIFEST_NAMESPACE: &str = "http://www.imsglobal.org/xsd/imsccv1p1/imscp_v1p1";
/// Placeholder the LMS replaces with the package's media root.
const FILEBASE: &str = "$IMS-CC-FILEBASE$";

/// The images that make up one quiz question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionImages {
    /// 1-based question number taken from the file name.
    pub number: u32,
    pub question: String,
    /// Choice file names in choice-pattern order.
    pub choices: Vec<String>,
}

impl QuestionImages {
    fn all_images(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.question.as_str()).chain(self.choices.iter().map(String::as_str))
    }
}

/// Fresh identifier: `g` followed by 32 hex digits.
pub fn new_ident() -> String {
    format!("g{}", Uuid::new_v4().simple())
}

/// Find the questions for exam `name` in `dir`.
///
/// A question whose choice images are all missing is skipped with a warning;
/// probing continues with the next number.
pub fn collect_questions(dir: &Path, name: &str, config: &PackageConfig) -> Vec<QuestionImages> {
    let mut questions = Vec::new();
    let mut number = 1u32;

    loop {
        let question = question_file_name(name, number, &config.question_suffix);
        if !dir.join(&question).is_file() {
            debug!("No {} in {}; stopping", question, dir.display());
            break;
        }

        let choices: Vec<String> = config
            .choice_pattern
            .iter()
            .map(|&k| choice_file_name(name, number, k))
            .filter(|c| dir.join(c).is_file())
            .collect();

        if choices.is_empty() {
            warn!("Question {} has no choice images; skipped", number);
        } else {
            questions.push(QuestionImages {
                number,
                question,
                choices,
            });
        }
        number += 1;
    }

    questions
}

/// QTI assessment document.
pub fn build_quiz_xml(
    title: &str,
    assessment_id: &str,
    questions: &[QuestionImages],
    config: &PackageConfig,
) -> String {
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(xml, r#"<questestinterop xmlns="{QTI_NAMESPACE}">"#);
    let _ = writeln!(
        xml,
        r#"  <assessment ident="{}" title="{}">"#,
        escape(assessment_id),
        escape(title)
    );
    xml.push_str("    <qtimetadata>\n");
    push_field(&mut xml, 6, "qmd_timelimit", &config.time_limit_minutes.to_string());
    xml.push_str("    </qtimetadata>\n");
    xml.push_str("    <section ident=\"root_section\">\n");
    for q in questions {
        push_item(&mut xml, q, config);
    }
    xml.push_str("    </section>\n");
    xml.push_str("  </assessment>\n");
    xml.push_str("</questestinterop>\n");
    xml
}

fn push_item(xml: &mut String, q: &QuestionImages, config: &PackageConfig) {
    let media = &config.media_dir;
    let choice_ids: Vec<String> = q.choices.iter().map(|_| new_ident()).collect();

    let _ = writeln!(
        xml,
        r#"      <item ident="{}" title="Question {}">"#,
        new_ident(),
        q.number
    );
    xml.push_str("        <itemmetadata>\n          <qtimetadata>\n");
    push_field(xml, 12, "question_type", QUESTION_TYPE);
    push_field(xml, 12, "points_possible", &format!("{:.1}", config.points_per_question));
    xml.push_str("          </qtimetadata>\n        </itemmetadata>\n");

    xml.push_str("        <presentation>\n");
    let stem = format!(
        r#"<div><p><img src="{FILEBASE}/{media}/{img}" alt="{img}"></p></div>"#,
        img = q.question
    );
    let _ = writeln!(
        xml,
        r#"          <material><mattext texttype="text/html">{}</mattext></material>"#,
        escape(stem.as_str())
    );
    xml.push_str("          <response_lid ident=\"response1\" rcardinality=\"Single\">\n");
    let _ = writeln!(
        xml,
        r#"            <render_choice shuffle="{}">"#,
        config.shuffle_choices
    );
    for (id, choice) in choice_ids.iter().zip(&q.choices) {
        let body = format!(r#"<p><img src="{FILEBASE}/{media}/{choice}" alt="{choice}"></p>"#);
        let _ = writeln!(
            xml,
            r#"              <response_label ident="{id}"><material><mattext texttype="text/html">{}</mattext></material></response_label>"#,
            escape(body.as_str())
        );
    }
    xml.push_str("            </render_choice>\n          </response_lid>\n");
    xml.push_str("        </presentation>\n");

    xml.push_str("        <resprocessing>\n");
    xml.push_str(
        "          <outcomes><decvar maxvalue=\"100\" minvalue=\"0\" varname=\"SCORE\" vartype=\"Decimal\"/></outcomes>\n",
    );
    // An out-of-range correct index leaves the question unscorable.
    if let Some(correct) = choice_ids.get(config.correct_choice_index) {
        xml.push_str("          <respcondition continue=\"No\">\n");
        let _ = writeln!(
            xml,
            r#"            <conditionvar><varequal respident="response1">{correct}</varequal></conditionvar>"#
        );
        xml.push_str("            <setvar action=\"Set\" varname=\"SCORE\">100</setvar>\n");
        xml.push_str("          </respcondition>\n");
    } else {
        warn!(
            "Question {} has {} choice(s); no correct answer at index {}",
            q.number,
            q.choices.len(),
            config.correct_choice_index
        );
    }
    xml.push_str("        </resprocessing>\n");
    xml.push_str("      </item>\n");
}

fn push_field(xml: &mut String, indent: usize, label: &str, entry: &str) {
    let pad = " ".repeat(indent);
    let _ = writeln!(
        xml,
        "{pad}<qtimetadatafield><fieldlabel>{}</fieldlabel><fieldentry>{}</fieldentry></qtimetadatafield>",
        escape(label),
        escape(entry)
    );
}

/// Content-package manifest listing the assessment and every image.
pub fn build_manifest_xml(
    assessment_id: &str,
    questions: &[QuestionImages],
    config: &PackageConfig,
) -> String {
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        xml,
        r#"<manifest identifier="{}" xmlns="{MANIFEST_NAMESPACE}">"#,
        new_ident()
    );
    xml.push_str("  <metadata>\n    <schema>IMS Content</schema>\n");
    let _ = writeln!(xml, "    <schemaversion>{SCHEMA_VERSION}</schemaversion>");
    xml.push_str("  </metadata>\n  <organizations/>\n  <resources>\n");
    let id = escape(assessment_id);
    let _ = writeln!(
        xml,
        r#"    <resource identifier="{id}" type="{ASSESSMENT_TYPE}"><file href="{id}/{id}.xml"/></resource>"#
    );
    for image in questions.iter().flat_map(QuestionImages::all_images) {
        let path = format!("{}/{}", config.media_dir, image);
        let href = escape(path.as_str());
        let _ = writeln!(
            xml,
            r#"    <resource identifier="{}" type="webcontent" href="{href}"><file href="{href}"/></resource>"#,
            new_ident()
        );
    }
    xml.push_str("  </resources>\n</manifest>\n");
    xml
}

/// Build `{output_dir}/{name}({count}).zip` from the images in `input_dir`.
pub fn create_package(
    input_dir: &Path,
    output_dir: &Path,
    name: &str,
    config: &PackageConfig,
) -> Result<PackageOutput, CutError> {
    let questions = collect_questions(input_dir, name, config);
    if questions.is_empty() {
        return Err(CutError::NoQuestionsFound {
            name: name.to_string(),
            dir: input_dir.to_path_buf(),
        });
    }
    info!(
        "Packaging {} question(s) for '{}' from {}",
        questions.len(),
        name,
        input_dir.display()
    );

    std::fs::create_dir_all(output_dir).map_err(|e| CutError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let zip_path = output_dir.join(format!("{}({}).zip", name, questions.len()));
    let tmp_path = zip_path.with_extension("zip.tmp");
    let assessment_id = new_ident();

    write_archive(&tmp_path, input_dir, name, &assessment_id, &questions, config).inspect_err(
        |_| {
            let _ = std::fs::remove_file(&tmp_path);
        },
    )?;
    std::fs::rename(&tmp_path, &zip_path).map_err(|e| CutError::OutputWriteFailed {
        path: zip_path.clone(),
        source: e,
    })?;

    info!("Package written: {}", zip_path.display());
    Ok(PackageOutput {
        zip_path,
        questions: questions.len(),
    })
}

fn write_archive(
    path: &Path,
    input_dir: &Path,
    name: &str,
    assessment_id: &str,
    questions: &[QuestionImages],
    config: &PackageConfig,
) -> Result<(), CutError> {
    let failed = |detail: String| CutError::PackageFailed {
        path: path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::create(path).map_err(|e| CutError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries: Vec<(String, Vec<u8>)> = vec![
        (
            "imsmanifest.xml".to_string(),
            build_manifest_xml(assessment_id, questions, config).into_bytes(),
        ),
        (
            format!("{assessment_id}/{assessment_id}.xml"),
            build_quiz_xml(name, assessment_id, questions, config).into_bytes(),
        ),
    ];
    for image in questions.iter().flat_map(QuestionImages::all_images) {
        let source: PathBuf = input_dir.join(image);
        let bytes = std::fs::read(&source)
            .map_err(|e| failed(format!("reading {}: {}", source.display(), e)))?;
        entries.push((format!("{}/{}", config.media_dir, image), bytes));
    }

    for (entry, bytes) in entries {
        zip.start_file(entry.as_str(), options)
            .map_err(|e| failed(format!("{entry}: {e}")))?;
        zip.write_all(&bytes)
            .map_err(|e| failed(format!("{entry}: {e}")))?;
    }
    zip.finish().map_err(|e| failed(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    fn count_elements(xml: &str, tag: &[u8]) -> usize {
        let mut reader = Reader::from_str(xml);
        let mut n = 0;
        loop {
            match reader.read_event().expect("well-formed xml") {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == tag => n += 1,
                Event::Eof => break,
                _ => {}
            }
        }
        n
    }

    fn sample() -> Vec<QuestionImages> {
        vec![
            QuestionImages {
                number: 1,
                question: "ex019.png".into(),
                choices: vec!["ex010.png".into(), "ex011.png".into()],
            },
            QuestionImages {
                number: 2,
                question: "ex029.png".into(),
                choices: vec!["ex020.png".into()],
            },
        ]
    }

    #[test]
    fn ident_shape() {
        let id = new_ident();
        assert_eq!(id.len(), 33);
        assert!(id.starts_with('g'));
        assert!(id[1..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_ident());
    }

    #[test]
    fn collect_stops_at_first_missing_question_and_skips_choiceless() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        for f in ["ex019.png", "ex010.png", "ex012.png", "ex029.png", "ex039.png", "ex030.png"] {
            touch(d, f);
        }
        // ex049.png missing: ex059.png is never reached.
        touch(d, "ex059.png");
        touch(d, "ex050.png");

        let qs = collect_questions(d, "ex", &PackageConfig::default());
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].number, 1);
        assert_eq!(qs[0].choices, vec!["ex010.png", "ex012.png"]);
        assert_eq!(qs[1].number, 3);
        assert_eq!(qs[1].choices, vec!["ex030.png"]);
    }

    #[test]
    fn choice_pattern_sets_order() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        for f in ["ex019.png", "ex010.png", "ex013.png"] {
            touch(d, f);
        }
        let config = PackageConfig::builder()
            .choice_pattern(vec![3, 0])
            .build()
            .unwrap();
        let qs = collect_questions(d, "ex", &config);
        assert_eq!(qs[0].choices, vec!["ex013.png", "ex010.png"]);
    }

    #[test]
    fn quiz_xml_is_well_formed_with_one_item_per_question() {
        let xml = build_quiz_xml("Mid <term> & co", "gabc", &sample(), &PackageConfig::default());
        assert_eq!(count_elements(&xml, b"item"), 2);
        assert_eq!(count_elements(&xml, b"response_label"), 3);
        assert_eq!(count_elements(&xml, b"respcondition"), 2);
        assert!(xml.contains(r#"title="Mid &lt;term&gt; &amp; co""#));
        assert!(xml.contains("<fieldentry>75</fieldentry>"));
        assert!(xml.contains("<fieldentry>1.0</fieldentry>"));
        assert!(xml.contains(r#"shuffle="true""#));
        assert!(xml.contains("$IMS-CC-FILEBASE$/Uploaded Media/ex019.png"));
    }

    #[test]
    fn correct_answer_points_at_configured_choice() {
        let config = PackageConfig::builder()
            .correct_choice_index(1)
            .build()
            .unwrap();
        let xml = build_quiz_xml("t", "gabc", &sample()[..1], &config);

        let label_ids: Vec<&str> = xml
            .lines()
            .filter_map(|l| l.split(r#"<response_label ident=""#).nth(1))
            .map(|rest| &rest[..33])
            .collect();
        let correct = xml
            .split(r#"<varequal respident="response1">"#)
            .nth(1)
            .map(|rest| &rest[..33])
            .unwrap();
        assert_eq!(label_ids.len(), 2);
        assert_eq!(correct, label_ids[1]);
    }

    #[test]
    fn manifest_lists_assessment_and_images() {
        let xml = build_manifest_xml("gabc", &sample(), &PackageConfig::default());
        assert_eq!(count_elements(&xml, b"resource"), 1 + 5);
        assert!(xml.contains(r#"<file href="gabc/gabc.xml"/>"#));
        assert!(xml.contains(r#"href="Uploaded Media/ex011.png""#));
    }

    #[test]
    fn package_contains_manifest_quiz_and_media() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for f in ["ex019.png", "ex010.png", "ex011.png", "ex029.png", "ex020.png"] {
            touch(input.path(), f);
        }

        let res = create_package(input.path(), out.path(), "ex", &PackageConfig::default())
            .unwrap();
        assert_eq!(res.questions, 2);
        assert_eq!(res.zip_path, out.path().join("ex(2).zip"));

        let mut archive =
            zip::ZipArchive::new(std::fs::File::open(&res.zip_path).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        assert!(names.contains(&"imsmanifest.xml".to_string()));
        assert!(names.contains(&"Uploaded Media/ex020.png".to_string()));
        let quiz = names
            .iter()
            .find(|n| n.ends_with(".xml") && n.contains('/'))
            .cloned()
            .unwrap();
        let (dir, file) = quiz.split_once('/').unwrap();
        assert_eq!(file, format!("{dir}.xml"));
        assert_eq!(names.len(), 2 + 5);

        let mut body = String::new();
        archive
            .by_name("Uploaded Media/ex011.png")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "ex011.png");
        assert!(!out.path().join("ex(2).zip.tmp").exists());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = create_package(input.path(), out.path(), "ex", &PackageConfig::default())
            .unwrap_err();
        assert!(matches!(err, CutError::NoQuestionsFound { .. }));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}

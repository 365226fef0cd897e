//! End-to-end scoring over files on disk, including the degradation paths
//! for corrupt and self-referential documents.

use std::fs;
use std::path::PathBuf;

use tempeval::{
    score_files, NamedScores, ScoreAccumulator, ScoreName, Scores, Selector,
    TemporalClosureScores, ViewName,
};

struct TempDocs {
    dir: PathBuf,
}

impl TempDocs {
    fn new(label: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "tempeval-test-{label}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for TempDocs {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

const GOLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<data><annotations>
    <entity><id>1@e@d@gold</id><type>EVENT</type><span>0,5</span></entity>
    <entity><id>2@e@d@gold</id><type>EVENT</type><span>10,15</span></entity>
    <entity><id>3@e@d@gold</id><type>EVENT</type><span>20,25</span></entity>
    <relation><id>4@r@d@gold</id><type>TLINK</type><properties>
        <Source>1@e@d@gold</Source><Target>2@e@d@gold</Target><Type>BEFORE</Type>
    </properties></relation>
    <relation><id>5@r@d@gold</id><type>TLINK</type><properties>
        <Source>2@e@d@gold</Source><Target>3@e@d@gold</Target><Type>BEFORE</Type>
    </properties></relation>
</annotations></data>
"#;

const SYSTEM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<data><annotations>
    <entity><id>1@e@d@sys</id><type>EVENT</type><span>0,5</span></entity>
    <entity><id>3@e@d@sys</id><type>EVENT</type><span>20,25</span></entity>
    <relation><id>9@r@d@sys</id><type>TLINK</type><properties>
        <Source>1@e@d@sys</Source><Target>3@e@d@sys</Target><Type>BEFORE</Type>
    </properties></relation>
</annotations></data>
"#;

#[test]
fn closure_scoring_credits_the_inferred_link() {
    let docs = TempDocs::new("closure");
    let gold = docs.write("doc1.gold.xml", GOLD);
    let system = docs.write("doc1.sys.xml", SYSTEM);
    let selector = Selector::from_exprs(&["TLINK:Type".to_string()], &[]);

    // Raw sets: the predicted link matches neither reference link.
    let raw: NamedScores<Scores> = score_files(&gold, Some(&system), &selector).unwrap();
    let name = ScoreName::View(ViewName::Property("TLINK".to_string(), "Type".to_string()));
    assert_eq!(raw[&name].correct, 0);

    // Closure: the predicted link is entailed by the reference chain.
    let closed: NamedScores<TemporalClosureScores> =
        score_files(&gold, Some(&system), &selector).unwrap();
    assert_eq!(closed[&name].precision_correct, 1);
    assert_eq!(closed[&name].precision(), 1.0);
    assert_eq!(closed[&name].recall_correct, 0);
}

#[test]
fn span_scoring_counts_the_missed_event() {
    let docs = TempDocs::new("spans");
    let gold = docs.write("doc1.gold.xml", GOLD);
    let system = docs.write("doc1.sys.xml", SYSTEM);

    let scores: NamedScores<Scores> =
        score_files(&gold, Some(&system), &Selector::all()).unwrap();
    let spans = &scores[&ScoreName::View(ViewName::Span("EVENT".to_string()))];
    assert_eq!((spans.reference, spans.predicted, spans.correct), (3, 2, 2));
}

#[test]
fn corrupt_predicted_file_degrades_to_empty() {
    let docs = TempDocs::new("corrupt");
    let gold = docs.write("doc1.gold.xml", GOLD);
    let broken = docs.write("doc1.sys.xml", "<data><annotations><entity>");

    let scores: NamedScores<Scores> =
        score_files(&gold, Some(&broken), &Selector::all()).unwrap();
    let all = &scores[&ScoreName::All];
    assert_eq!(all.predicted, 0);
    assert_eq!(all.recall(), 0.0);
}

#[test]
fn missing_predicted_file_degrades_to_empty() {
    let docs = TempDocs::new("missing");
    let gold = docs.write("doc1.gold.xml", GOLD);
    let absent = docs.dir.join("nonexistent.xml");

    let scores: NamedScores<Scores> =
        score_files(&gold, Some(&absent), &Selector::all()).unwrap();
    assert_eq!(scores[&ScoreName::All].predicted, 0);
}

#[test]
fn self_referential_document_is_excluded_with_a_warning() {
    let docs = TempDocs::new("selfref");
    let gold = docs.write("doc1.gold.xml", GOLD);
    let cyclic = docs.write(
        "doc1.sys.xml",
        r#"<data><annotations>
            <relation><id>a</id><type>TLINK</type><properties><Target>b</Target></properties></relation>
            <relation><id>b</id><type>TLINK</type><properties><Target>a</Target></properties></relation>
        </annotations></data>"#,
    );

    let scores: NamedScores<Scores> =
        score_files(&gold, Some(&cyclic), &Selector::all()).unwrap();
    // The cyclic document scores as empty rather than aborting the run.
    assert_eq!(scores[&ScoreName::All].predicted, 0);
}

use chrono::Local;
use divan::Bencher;
use taxi_eds::{TextDocument, ValidationResult, map_to_diagnostics};

fn main() {
    divan::main();
}

fn large_document(lines: usize) -> TextDocument {
    let text = (0..lines)
        .map(|i| format!("<tr><td class=\"cell-{i}\">Row {i}</td></tr>"))
        .collect::<Vec<_>>()
        .join("\n");
    TextDocument::new("bench.html", text)
}

fn large_response(issues: usize, keyed: bool) -> String {
    let item = |i: usize, kind: &str| {
        format!(
            r#"{{"type":"{kind}","message":"Problem {i}","details":"first line\r\nsecond line","element":"<td>","line":{}}}"#,
            i + 1
        )
    };
    let collection = |kind: &str| {
        if keyed {
            let body = (0..issues)
                .map(|i| format!("\"k{i}\":{}", item(i, kind)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        } else {
            let body = (0..issues).map(|i| item(i, kind)).collect::<Vec<_>>().join(",");
            format!("[{body}]")
        }
    };
    format!(
        r#"{{"total_errors":{issues},"total_warnings":{issues},"errors":{},"warnings":{}}}"#,
        collection("ERROR"),
        collection("WARN")
    )
}

#[divan::bench(args = [10, 100, 1000])]
fn map_parsed_result(bencher: Bencher, issues: usize) {
    let document = large_document(2000);
    let result: ValidationResult =
        serde_json::from_str(&large_response(issues, false)).expect("valid response");

    bencher.bench_local(|| map_to_diagnostics(&result, &document, Local::now(), true, "validate"));
}

#[divan::bench(args = [false, true])]
fn parse_and_map(bencher: Bencher, keyed: bool) {
    let document = large_document(2000);
    let body = large_response(500, keyed);

    bencher.bench_local(|| {
        let result: ValidationResult = serde_json::from_str(&body).expect("valid response");
        map_to_diagnostics(&result, &document, Local::now(), false, "validate")
    });
}

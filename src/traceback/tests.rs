use super::*;

const PYTHON_LOG: &str = r#"Traceback (most recent call last):
  File "/app/main.py", line 10, in <module>
    run()
  File "/app/service.py", line 25, in run
    return process(data)
ZeroDivisionError: division by zero"#;

const NODE_LOG: &str = "TypeError: Cannot read properties of undefined (reading 'id')
    at getUser (/app/src/users.js:42:15)
    at Object.handler (/app/src/routes.js:10:5)";

const GO_LOG: &str = "panic: runtime error: invalid memory address or nil pointer dereference
[signal SIGSEGV: segmentation violation]

goroutine 1 [running]:
main.(*Server).handle(0x0)
\t/app/server.go:42 +0x1d
main.main()
\t/app/main.go:12 +0x25
exit status 2";

const RUST_LOG: &str = "thread 'main' panicked at src/parser.rs:42:17:
index out of bounds: the len is 3 but the index is 5
note: run with `RUST_BACKTRACE=1` environment variable to display a backtrace";

const JAVA_LOG: &str = "java.lang.IllegalStateException: name is null
\tat com.example.UserService.findUser(UserService.java:42)
\tat com.example.Main.main(Main.java:10)";

const CSHARP_LOG: &str = "System.NullReferenceException: Object reference not set
   at App.Handler.Run() in /src/App/Handler.cs:line 27
   at App.Program.Main() in /src/App/Program.cs:line 8";

const RUBY_LOG: &str = "/app/models/invoice.rb:12:in `total': undefined method `sum' for nil (NoMethodError)
\tfrom /app/controllers/billing.rb:30:in `show'
\tfrom /app/main.rb:5:in `<main>'";

const PHP_LOG: &str = "PHP Fatal error:  Uncaught Error: Call to undefined function foo() in /var/www/app/index.php on line 14";

#[test]
fn test_detect_language_per_format() {
    assert_eq!(detect_language(PYTHON_LOG), Language::Python);
    assert_eq!(detect_language(NODE_LOG), Language::JavaScript);
    assert_eq!(detect_language(GO_LOG), Language::Go);
    assert_eq!(detect_language(RUST_LOG), Language::Rust);
    assert_eq!(detect_language(JAVA_LOG), Language::Java);
    assert_eq!(detect_language(CSHARP_LOG), Language::CSharp);
    assert_eq!(detect_language(RUBY_LOG), Language::Ruby);
    assert_eq!(detect_language(PHP_LOG), Language::Php);
}

#[test]
fn test_detect_language_unknown_without_markers() {
    assert_eq!(detect_language("everything is fine"), Language::Unknown);
    assert!(language_scores("everything is fine").iter().all(|(_, s)| *s == 0));
}

#[test]
fn test_detect_language_tie_goes_to_earlier() {
    // "at " is a marker for JavaScript, Java and C#
    assert_eq!(detect_language("look at this"), Language::JavaScript);
}

#[test]
fn test_detected_language_has_nonzero_score() {
    for log in [PYTHON_LOG, NODE_LOG, GO_LOG, RUST_LOG, JAVA_LOG, RUBY_LOG] {
        let lang = detect_language(log);
        let score = language_scores(log)
            .into_iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, s)| s)
            .unwrap();
        assert!(score > 0);
    }
}

#[test]
fn test_python_frames_keep_order() {
    let parsed = parse_traceback(PYTHON_LOG, None);
    assert_eq!(parsed.language, Language::Python);
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[0].filepath, "/app/main.py");
    assert_eq!(parsed.frames[0].function_name, None);

    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.filepath, "/app/service.py");
    assert_eq!(primary.line_number, 25);
    assert_eq!(primary.function_name.as_deref(), Some("run"));

    assert_eq!(parsed.error_type.as_deref(), Some("ZeroDivisionError"));
    assert_eq!(parsed.error_message.as_deref(), Some("division by zero"));
}

#[test]
fn test_node_frames_reversed_to_innermost_last() {
    let parsed = parse_traceback(NODE_LOG, None);
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[0].filepath, "/app/src/routes.js");
    assert_eq!(parsed.frames[0].function_name.as_deref(), Some("Object.handler"));

    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.filepath, "/app/src/users.js");
    assert_eq!(primary.line_number, 42);
    assert_eq!(primary.column_number, Some(15));
    assert_eq!(primary.function_name.as_deref(), Some("getUser"));

    assert_eq!(parsed.error_type.as_deref(), Some("TypeError"));
}

#[test]
fn test_go_frames_deduplicated() {
    let parsed = parse_traceback(GO_LOG, None);
    let files: Vec<&str> = parsed.frames.iter().map(|f| f.filepath.as_str()).collect();
    assert_eq!(files, vec!["/app/main.go", "/app/server.go"]);

    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.line_number, 42);
    assert_eq!(parsed.error_type, None);
    assert_eq!(
        parsed.error_message.as_deref(),
        Some("runtime error: invalid memory address or nil pointer dereference")
    );
}

#[test]
fn test_rust_panic_location() {
    let parsed = parse_traceback(RUST_LOG, None);
    assert_eq!(parsed.frames.len(), 1);
    let frame = &parsed.frames[0];
    assert_eq!(frame.filepath, "src/parser.rs");
    assert_eq!(frame.line_number, 42);
    assert_eq!(frame.column_number, Some(17));
}

#[test]
fn test_rust_quoted_panic_message() {
    let log = "thread 'main' panicked at 'explicit panic', src/main.rs:5:5";
    let (error_type, message) = extract_error_info(log, Language::Rust);
    assert_eq!(error_type, None);
    assert_eq!(message.as_deref(), Some("explicit panic"));
}

#[test]
fn test_java_frames_and_exception() {
    let parsed = parse_traceback(JAVA_LOG, None);
    assert_eq!(parsed.frames.len(), 2);
    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.filepath, "UserService.java");
    assert_eq!(
        primary.function_name.as_deref(),
        Some("com.example.UserService.findUser")
    );
    assert_eq!(
        parsed.error_type.as_deref(),
        Some("java.lang.IllegalStateException")
    );
    assert_eq!(parsed.error_message.as_deref(), Some("name is null"));
}

#[test]
fn test_csharp_fields_in_order() {
    let parsed = parse_traceback(CSHARP_LOG, None);
    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.filepath, "/src/App/Handler.cs");
    assert_eq!(primary.line_number, 27);
    assert_eq!(primary.function_name.as_deref(), Some("App.Handler.Run"));
}

#[test]
fn test_ruby_fields_in_order() {
    let parsed = parse_traceback(RUBY_LOG, None);
    let files: Vec<&str> = parsed.frames.iter().map(|f| f.filepath.as_str()).collect();
    assert_eq!(
        files,
        vec!["/app/main.rb", "/app/controllers/billing.rb", "/app/models/invoice.rb"]
    );
    let primary = parsed.primary_frame().unwrap();
    assert_eq!(primary.line_number, 12);
    assert_eq!(primary.function_name.as_deref(), Some("total"));
    assert_eq!(parsed.frames[1].function_name.as_deref(), Some("show"));
}

#[test]
fn test_php_fatal_error_location() {
    let parsed = parse_traceback(PHP_LOG, None);
    assert_eq!(parsed.frames.len(), 1);
    assert_eq!(parsed.frames[0].filepath, "/var/www/app/index.php");
    assert_eq!(parsed.frames[0].line_number, 14);
}

#[test]
fn test_generic_pattern_for_hinted_c() {
    let parsed = parse_traceback("main.c:10:5: error: boom", Some(Language::C));
    assert_eq!(parsed.frames.len(), 1);
    assert_eq!(parsed.frames[0].filepath, "main.c");
    assert_eq!(parsed.frames[0].line_number, 10);
    assert_eq!(parsed.frames[0].column_number, Some(5));
}

#[test]
fn test_hint_overrides_detection() {
    let parsed = parse_traceback(PYTHON_LOG, Some(Language::Go));
    assert_eq!(parsed.language, Language::Go);
    assert!(parsed.frames.is_empty());
}

#[test]
fn test_frameless_log() {
    let parsed = parse_traceback("Error: something went wrong", None);
    assert!(parsed.frames.is_empty());
    assert!(parsed.primary_frame().is_none());
    assert!(parsed.files().is_empty());
    assert_eq!(parsed.error_message.as_deref(), Some("something went wrong"));
}

#[test]
fn test_generic_error_fallback() {
    let (error_type, message) = extract_error_info("fatal: not a git repository", Language::Ruby);
    assert_eq!(error_type, None);
    assert_eq!(message.as_deref(), Some("not a git repository"));
}

#[test]
fn test_extract_file_line_pairs() {
    let pairs = extract_file_line_pairs(PYTHON_LOG, None);
    assert_eq!(
        pairs,
        vec![
            ("/app/main.py".to_string(), 10),
            ("/app/service.py".to_string(), 25)
        ]
    );
}

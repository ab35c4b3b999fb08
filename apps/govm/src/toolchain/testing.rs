//! Fixtures shared by the toolchain unit tests.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::path::Path;

/// Writes a fake installation at `dir` whose `bin/go` prints a `go version`
/// line for `version`.
#[cfg(unix)]
pub fn fake_go_install(dir: &Path, version: &str) {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let go = bin.join("go");
    fs::write(&go, go_script(version)).unwrap();
    fs::set_permissions(&go, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Shell script standing in for the go binary.
pub fn go_script(version: &str) -> String {
    format!("#!/bin/sh\necho \"go version go{version} linux/amd64\"\n")
}

/// Builds a gzip-compressed tar laid out like an official release: a single
/// `go/` top-level folder with `bin/go`, `VERSION`, and a source file.
pub fn go_archive(version: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    append(&mut builder, "go/VERSION", format!("go{version}\n").as_bytes(), 0o644);
    append(&mut builder, "go/bin/go", go_script(version).as_bytes(), 0o755);
    append(&mut builder, "go/src/runtime/extern.go", b"package runtime\n", 0o644);
    builder.into_inner().unwrap().finish().unwrap()
}

/// Builds a well-formed archive with no `bin/go` entry.
pub fn archive_without_binary() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    append(&mut builder, "go/README.md", b"nothing to run\n", 0o644);
    builder.into_inner().unwrap().finish().unwrap()
}

/// Builds a release archive whose tree already holds a directory where the
/// completion marker belongs, so writing the marker fails.
pub fn archive_blocking_marker(version: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    append(&mut builder, "go/bin/go", go_script(version).as_bytes(), 0o755);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, "go/.govm-install.json/", std::io::empty())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn append<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8], mode: u32) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, path, data).unwrap();
}

/// Serves canned `(path, status, body)` responses on a loopback port and
/// returns the base URL. Unknown paths get a 404. The server thread lives
/// until the test process exits.
pub fn serve(routes: Vec<(String, u16, Vec<u8>)>) -> String {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = routes
                .iter()
                .find(|(route, _, _)| *route == path)
                .map_or((404, b"not found".to_vec()), |(_, status, body)| {
                    (*status, body.clone())
                });
            let head = format!(
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    format!("http://{addr}")
}

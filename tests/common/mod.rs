#![allow(dead_code)]

use std::{fs::File, io::Write, path::Path};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

// style 1 uses built-in number format 14 (m/d/yyyy)
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

/// Sheet with a number, a quoted string, a boolean, an empty row, and a
/// date-formatted serial with a gap after it.
pub const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1"><v>42</v></c><c r="B1" t="inlineStr"><is><t>a&quot;b</t></is></c><c r="C1" t="b"><v>1</v></c></row>
<row r="3"><c r="A3"><v>3.5</v></c><c r="B3" t="inlineStr"><is><t>  x  </t></is></c><c r="C3" t="b"><v>0</v></c></row>
<row r="4"><c r="A4" s="1"><v>45000</v></c><c r="C4" t="inlineStr"><is><t>gap</t></is></c></row>
</sheetData>
</worksheet>"#;

/// Expected CSV lines for [`SHEET`], without terminators.
pub const EXPECTED_LINES: [&str; 3] = [
    r#""42","a""b","true""#,
    r#""3.5","x","false""#,
    r#""15.03.2023","","gap""#,
];

/// Two four-column rows whose last cell is styled but holds no value.
pub const TRAILING_BLANK_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:D2"/>
<sheetData>
<row r="1"><c r="A1"><v>42</v></c><c r="B1" t="inlineStr"><is><t>a&quot;b</t></is></c><c r="C1" t="b"><v>1</v></c><c r="D1" s="0"/></row>
<row r="2"><c r="A2"><v>3.5</v></c><c r="B2" t="inlineStr"><is><t>x</t></is></c><c r="C2" t="b"><v>0</v></c><c r="D2" s="0"/></row>
</sheetData>
</worksheet>"#;

/// Write a minimal `.xlsx` holding `sheet_xml` as its only worksheet.
pub fn write_xlsx(path: &Path, sheet_xml: &str) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", sheet_xml),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

//! Workbook fixtures shared by the integration tests
//!
//! Built in memory with rust_xlsxwriter and read back through calamine,
//! exactly like uploaded files.

#![allow(dead_code)]

use rust_xlsxwriter::{Formula, Workbook, Worksheet, XlsxError};

/// Write non-empty strings of `cells` starting at column 0.
pub fn write_row(worksheet: &mut Worksheet, row: u32, cells: &[&str]) -> Result<(), XlsxError> {
    for (col, value) in cells.iter().enumerate() {
        if !value.is_empty() {
            worksheet.write_string(row, col as u16, *value)?;
        }
    }
    Ok(())
}

/// SINAPI header cells: month in B3, regime in D4, region in D5.
pub fn write_metadata_cells(
    worksheet: &mut Worksheet,
    month: &str,
    regime: &str,
    region: &str,
) -> Result<(), XlsxError> {
    worksheet.write_string(0, 0, "SINAPI - Sistema Nacional de Pesquisa de Custos")?;
    worksheet.write_string(2, 0, "Mês de referência:")?;
    worksheet.write_string(2, 1, month)?;
    worksheet.write_string(3, 2, "Encargos:")?;
    worksheet.write_string(3, 3, regime)?;
    worksheet.write_string(4, 2, "Localidade:")?;
    worksheet.write_string(4, 3, region)?;
    Ok(())
}

pub fn save(mut workbook: Workbook) -> Vec<u8> {
    workbook.save_to_buffer().expect("fixture workbook")
}

/// One analytic sheet (header row 9, code 9999) and one CSD sheet
/// (SP/RJ header on row 10, `150,50` for SP on row 11).
pub fn sinapi_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();

    let analytic = workbook.add_worksheet();
    analytic.set_name("Analitico").unwrap();
    write_row(analytic, 8, &["CODIGO", "DESCRICAO", "UNIDADE", "GRUPO"]).unwrap();
    write_row(analytic, 9, &["9999", "COMPOSICAO TESTE", "M2", "ALVENARIA"]).unwrap();

    let csd = workbook.add_worksheet();
    csd.set_name("CSD").unwrap();
    write_metadata_cells(csd, "12/2025", "Sem Desoneração", "SP").unwrap();
    write_row(csd, 9, &["CODIGO", "DESCRICAO", "SP", "RJ"]).unwrap();
    write_row(csd, 10, &["9999", "COMPOSICAO TESTE", "150,50", ""]).unwrap();

    save(workbook)
}

/// The same table on CSD, CCD and CSE sheets plus a MENU sheet.
pub fn three_regime_workbook() -> Vec<u8> {
    let headers = ["CODIGO", "DESCRICAO", "UNIDADE", "SP", "RJ", "MG"];
    let data = ["123", "Item Test 1", "UN", "10,00", "11,00", "12,00"];

    let mut workbook = Workbook::new();
    for name in ["CSD_MACRO_ABC", "CCD_OUTRA_COISA", "CSE_BLABLA", "MENU"] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name).unwrap();
        write_row(sheet, 0, &headers).unwrap();
        write_row(sheet, 1, &data).unwrap();
    }
    save(workbook)
}

/// Codes wrapped in HYPERLINK formulas; their cached value is 0.
pub fn hyperlink_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("SINAPI_CSD_2025_12").unwrap();
    write_metadata_cells(sheet, "12/2025", "Sem Desoneração", "SP").unwrap();
    write_row(sheet, 5, &["Código", "Descrição", "Unidade", "SP", "RJ"]).unwrap();

    let rows = [
        (104658, "Alvenaria de vedação", "M2", 150.5),
        (104659, "Chapisco aplicado em alvenaria", "M2", 12.3),
    ];
    for (i, (code, description, unit, sp)) in rows.iter().enumerate() {
        let row = 6 + i as u32;
        sheet
            .write_formula(row, 0, Formula::new(format!("=HYPERLINK(\"#\",{})", code)))
            .unwrap();
        sheet.write_string(row, 1, *description).unwrap();
        sheet.write_string(row, 2, *unit).unwrap();
        sheet.write_number(row, 3, *sp).unwrap();
    }
    save(workbook)
}

/// Codes 100, 200, 100 in that order on one CSD sheet.
pub fn duplicate_code_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("CSD").unwrap();
    write_metadata_cells(sheet, "11/2025", "Sem Desoneração", "BA").unwrap();
    write_row(sheet, 6, &["CODIGO", "DESCRICAO", "UNIDADE", "BA"]).unwrap();
    write_row(sheet, 7, &["100", "Primeira ocorrência", "M3", "1,00"]).unwrap();
    write_row(sheet, 8, &["200", "Outra composição", "M3", "2,00"]).unwrap();
    write_row(sheet, 9, &["100", "Segunda ocorrência", "M3", "3,00"]).unwrap();
    save(workbook)
}

/// `rows` compositions with a price for every one, on a CSD sheet.
pub fn many_rows_workbook(rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("CSD").unwrap();
    write_metadata_cells(sheet, "10/2025", "Sem Desoneração", "PR").unwrap();
    write_row(sheet, 6, &["CODIGO", "DESCRICAO", "UNIDADE", "PR"]).unwrap();
    for i in 0..rows {
        let row = 7 + i;
        sheet.write_string(row, 0, (10_000 + i).to_string()).unwrap();
        sheet.write_string(row, 1, format!("Composição {}", i)).unwrap();
        sheet.write_string(row, 2, "UN").unwrap();
        sheet.write_number(row, 3, 1.0 + i as f64).unwrap();
    }
    save(workbook)
}

/// No price token anywhere: a MENU sheet and a data sheet without regime tag.
pub fn untagged_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();

    let menu = workbook.add_worksheet();
    menu.set_name("MENU").unwrap();
    write_row(menu, 0, &["CODIGO", "DESCRICAO", "SP"]).unwrap();
    write_row(menu, 1, &["555", "Não deveria ser lido", "9,99"]).unwrap();

    let data = workbook.add_worksheet();
    data.set_name("Precos").unwrap();
    write_row(data, 0, &["CODIGO", "DESCRICAO", "SP"]).unwrap();
    write_row(data, 1, &["777", "Composição sem aba marcada", "7,77"]).unwrap();

    save(workbook)
}

/// Price rows lacking unit/group, and one lacking its code, completed
/// from an analytic sheet.
pub fn catalog_fill_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();

    let analytic = workbook.add_worksheet();
    analytic.set_name("Analitico").unwrap();
    write_row(analytic, 3, &["Código", "Descrição", "Unidade", "Grupo"]).unwrap();
    write_row(analytic, 4, &["8888", "Chapisco rolado em parede", "M2", "REVESTIMENTO"]).unwrap();
    write_row(analytic, 5, &["7777", "Contrapiso em argamassa", "M2", "PISO"]).unwrap();

    let prices = workbook.add_worksheet();
    prices.set_name("Sintetico CSD").unwrap();
    write_metadata_cells(prices, "09/2025", "Sem Desoneração", "MG").unwrap();
    write_row(prices, 7, &["Código", "Descrição", "MG"]).unwrap();
    write_row(prices, 8, &["7777", "Contrapiso em argamassa", "45,10"]).unwrap();
    write_row(prices, 9, &["", "CHAPISCO ROLADO EM PAREDE", "8,25"]).unwrap();

    save(workbook)
}

/// Only a MENU sheet; nothing to import.
pub fn menu_only_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let menu = workbook.add_worksheet();
    menu.set_name("MENU").unwrap();
    write_row(menu, 0, &["SINAPI", "Selecione uma aba"]).unwrap();
    save(workbook)
}

/// A CSD sheet whose table has no recognizable header row.
pub fn headerless_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("CSD").unwrap();
    write_metadata_cells(sheet, "12/2025", "Sem Desoneração", "SP").unwrap();
    write_row(sheet, 7, &["Item", "Texto", "Valor"]).unwrap();
    write_row(sheet, 8, &["9999", "COMPOSICAO TESTE", "150,50"]).unwrap();
    save(workbook)
}

/// Price cells spelled as non-finite numbers: row 501 has no real value,
/// row 502 has one for SP.
pub fn non_finite_price_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("CSD").unwrap();
    write_metadata_cells(sheet, "12/2025", "Sem Desoneração", "SP").unwrap();
    write_row(sheet, 6, &["CODIGO", "DESCRICAO", "SP", "RJ"]).unwrap();
    write_row(sheet, 7, &["501", "Sem preço real", "inf", "-nan"]).unwrap();
    write_row(sheet, 8, &["502", "Preço parcial", "10,00", "Infinity"]).unwrap();
    save(workbook)
}

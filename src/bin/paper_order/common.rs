pub fn print_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) {
    let mut widths = [0usize; N];
    for (i, h) in headers.iter().enumerate() {
        widths[i] = widths[i].max(display_width(h));
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let line = |cells: &mut dyn Iterator<Item = String>| {
        let text: Vec<String> = cells
            .zip(widths)
            .map(|(cell, width)| format!("{:width$}", cell, width = width))
            .collect();
        println!("{}", text.join("  ").trim_end());
    };
    line(&mut headers.iter().map(|h| h.to_string()));
    line(&mut widths.iter().map(|w| "-".repeat(*w)));
    for row in rows {
        line(&mut row.iter().cloned());
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

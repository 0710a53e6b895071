/*!

This is the long-form manual for `demographics` and `popstory`.

## Input format

The population table is a single CSV file in a Latin-1 compatible encoding
(the upstream United Nations export ships as ISO-8859-1). The first row is a
header; column order does not matter. Expected columns:

| Column | Content |
|---|---|
| `Country` | Country display name |
| `ISO3_code` | Three-letter country code, used in short titles |
| `Subregion` | UN subregion of the country |
| `Continent` | Continent of the country |
| `Gender` | Gender label (`Male`, `Female`) |
| `G_Type` | Display noun for the gender (`Men`, `Women`) |
| `Year` | Birth year, 1950 to 2024 |
| `Population` | Number of people born, non-negative integer |
| `Generation` | Optional cohort label; derived from `Year` when absent |

Each (`Country`, `Gender`, `Year`) combination may appear at most once.
Malformed rows (non-numeric population, out-of-range year, duplicate or
conflicting rows) abort the load with a descriptive error.

## Command line

Build the age-mates story for a 1980-born French man and print the story
JSON to the standard output:

```bash
popstory --data data.csv --year 1980 --country France --gender Male
```

Build the contemporaries story and write both the renderer JSON and a
standalone HTML export:

```bash
popstory --data data.csv --year 1996 --country Japan --gender Female \
  --story contemporaries --out story.json --html story.html
```

Check the produced JSON against a reference file (the run fails and prints a
line diff when they differ):

```bash
popstory --data data.csv --year 1980 --country France --gender Male \
  --reference expected_story.json
```

## Output

The story JSON carries everything the animated-chart renderer needs for one
request:

```text
{
  "data":      { "records": [...] }     the table plus Year2/IsSelectedYear
  "slides":    [ { "steps": [...] } ]   ordered chart transitions
  "features":  { "tooltip": true }
  "startSlide": 6                       age-mates only
}
```

Each step object holds an optional `filter` (a record expression such as
`record['Year'] == '1980'`, or `null` to clear the active filter), a
`config` object with the chart channels and title, and an optional `style`
object. The HTML export wraps the same JSON in a self-contained page that
loads the renderer from its CDN.

*/
